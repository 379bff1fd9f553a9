//! Generation entry points, one module per media surface.
//!
//! Synchronous paths (image, speech, music) return decoded artifacts
//! in-memory; the video path drives a long-running operation and
//! returns local file paths.

pub mod image;
pub mod music;
pub mod speech;
pub mod tryon;
pub mod video;

pub use image::{generate_images, ImageRequest};
pub use music::{generate_music, MusicRequest};
pub use speech::{synthesize_speech, SpeechRequest};
pub use tryon::{generate_try_on, TryOnRequest};
pub use video::{
    video_from_blob, video_from_image, video_from_references, video_from_text, LroPhase,
    LroProgress, VideoEnv, VideoParams, VideoSource,
};
