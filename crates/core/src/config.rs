//! Runtime settings recognized by the orchestrator.
//!
//! All knobs have defaults; explicit values and environment variables
//! override discovery. Uses `#[serde(default)]` to allow partial
//! config when deserialized from a host-provided document.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix for all recognized settings.
const ENV_PREFIX: &str = "GENMEDIA";

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Explicit project id; overrides metadata discovery
    pub project_id: Option<String>,

    /// Explicit region; overrides metadata discovery
    pub region: Option<String>,

    /// Number of retries after the first attempt
    pub retry_count: u32,

    /// Base delay between retry attempts, in seconds
    pub retry_delay_seconds: u64,

    /// Fixed delay between LRO polls, in seconds
    pub poll_interval_seconds: u64,

    /// Log severity passed to the tracing subscriber
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_id: None,
            region: None,
            retry_count: 3,
            retry_delay_seconds: 5,
            poll_interval_seconds: 20,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Build settings from the environment, falling back to defaults.
    ///
    /// Recognized variables: `GENMEDIA_PROJECT_ID`, `GENMEDIA_REGION`,
    /// `GENMEDIA_RETRY_COUNT`, `GENMEDIA_RETRY_DELAY_SECONDS`,
    /// `GENMEDIA_POLL_INTERVAL_SECONDS`, `GENMEDIA_LOG_LEVEL`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Some(v) = env_var("PROJECT_ID") {
            settings.project_id = Some(v);
        }
        if let Some(v) = env_var("REGION") {
            settings.region = Some(v);
        }
        if let Some(v) = env_var("RETRY_COUNT").and_then(|v| v.parse().ok()) {
            settings.retry_count = v;
        }
        if let Some(v) = env_var("RETRY_DELAY_SECONDS").and_then(|v| v.parse().ok()) {
            settings.retry_delay_seconds = v;
        }
        if let Some(v) = env_var("POLL_INTERVAL_SECONDS").and_then(|v| v.parse().ok()) {
            settings.poll_interval_seconds = v;
        }
        if let Some(v) = env_var("LOG_LEVEL") {
            settings.log_level = v;
        }

        settings
    }

    /// Base retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    /// LRO poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}_{suffix}"))
        .ok()
        .filter(|v| !v.is_empty())
}
