//! Retry policy and taxonomy mapping for remote calls.
//!
//! This is the single retry point in the orchestrator: every remote
//! call (submission, poll, predict, synthesis) goes through
//! [`invoke`]. Only quota and availability codes are retried; all
//! terminal codes map onto the error taxonomy exactly once, here.

use crate::error::{Error, RemoteError, RemoteStatus, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Ceiling on the backoff delay between attempts.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Bounded exponential backoff policy for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retry_count: u32,
    /// Base delay before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given retry count and base delay.
    pub fn new(retry_count: u32, base_delay: Duration) -> Self {
        Self {
            retry_count,
            base_delay,
        }
    }

    /// Policy derived from orchestrator settings.
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self::new(settings.retry_count, settings.retry_delay())
    }

    /// Delay before retry `attempt` (0-indexed): base doubled per
    /// attempt with up to 10% jitter, capped at [`MAX_DELAY`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let scaled = base_ms.saturating_mul(1u64 << attempt.min(16));
        let jitter = rand::thread_rng().gen_range(0..=scaled / 10 + 1);
        Duration::from_millis(scaled + jitter).min(MAX_DELAY)
    }
}

impl Default for RetryPolicy {
    /// Default policy: 3 retries, 5 second base delay.
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Run a remote operation under the retry policy.
///
/// The operation runs up to `retry_count + 1` times. Retryable
/// failures (`ResourceExhausted`, `Unavailable`) sleep and re-run;
/// when attempts are exhausted they surface as `QuotaExhausted` /
/// `Unavailable` carrying the last remote diagnostic. Terminal codes
/// map immediately per the taxonomy.
pub async fn invoke<T, F, Fut>(policy: &RetryPolicy, model_label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RemoteError>>,
{
    let max_attempts = policy.retry_count + 1;
    let mut last_error: Option<RemoteError> = None;

    for attempt in 0..max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(remote) if remote.status.is_retryable() => {
                tracing::warn!(
                    model = model_label,
                    attempt = attempt + 1,
                    max_attempts,
                    status = ?remote.status,
                    "transient remote failure: {}",
                    remote.message
                );
                last_error = Some(remote);
                if attempt + 1 < max_attempts {
                    let delay = policy.delay_for_attempt(attempt);
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
            Err(remote) => return Err(map_terminal(remote, model_label)),
        }
    }

    // All attempts consumed on retryable codes.
    let remote = match last_error {
        Some(remote) => remote,
        None => return Err(Error::Unknown(format!("{model_label}: no attempts executed"))),
    };
    Err(match remote.status {
        RemoteStatus::ResourceExhausted => Error::QuotaExhausted(format!(
            "{model_label}: retries exhausted: {}",
            remote.message
        )),
        _ => Error::Unavailable(format!(
            "{model_label}: retries exhausted: {}",
            remote.message
        )),
    })
}

fn map_terminal(remote: RemoteError, model_label: &str) -> Error {
    let message = format!("{model_label}: {}", remote.message);
    match remote.status {
        RemoteStatus::InvalidArgument => Error::Input(message),
        RemoteStatus::PermissionDenied | RemoteStatus::Unauthenticated => {
            Error::PermissionDenied(message)
        }
        RemoteStatus::DeadlineExceeded => Error::Timeout(message),
        RemoteStatus::NotFound => Error::NotFound(message),
        _ => Error::Unknown(message),
    }
}
