//! Generative-media call orchestration for cloud generation endpoints.
//!
//! This crate turns typed media requests into remote calls against the
//! image, video, speech, and music generation surfaces, and converts
//! the responses back into host-native artifacts.
//!
//! # Architecture
//!
//! - [`context`] resolves the `(project, region, user-agent)` triple,
//!   falling back to the host-metadata service.
//! - [`clients`] caches one HTTP client per `(project, region, kind)`.
//! - [`retry`] is the single retry point; it classifies remote status
//!   codes and maps terminal ones onto the error taxonomy.
//! - [`codec`] converts pixel tensors and WAV payloads to and from
//!   wire bytes.
//! - [`storage`] validates and moves object-store blobs.
//! - [`generate`] holds the per-surface entry points: synchronous
//!   image/speech/music calls and the long-running video path.
//!
//! Remote surfaces are reached through the traits in [`service`], so
//! everything above them can be exercised against in-memory stubs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clients;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod models;
pub mod retry;
pub mod service;
pub mod storage;

pub use codec::{AudioArtifact, EncodedImage, ImageMime, MediaTensor};
pub use config::Settings;
pub use context::{ContextResolver, ExecutionContext};
pub use error::{Error, ErrorKind, Result};
pub use retry::RetryPolicy;
pub use storage::GcsUri;

/// Initialize logging for binaries and node hosts.
///
/// Reads `RUST_LOG` when set, otherwise falls back to the level from
/// [`Settings`]. Call once at startup.
pub fn init(settings: &Settings) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .try_init()
        .map_err(|e| Error::Configuration(format!("logging already initialized: {e}")))?;

    tracing::info!("generative media orchestrator initialized");
    Ok(())
}
