//! Conversions between host-native tensors and wire-format payloads.
//!
//! Images travel as PNG/JPEG bytes (often base64-wrapped); audio comes
//! back as WAV. Pixel tensors are `(batch, height, width, channels)`
//! floats in `[0, 1]`; waveforms are `(1, channels, samples)` floats
//! in `[-1, 1]`.

pub mod audio;
pub mod image;

pub use audio::{wav_to_audio, AudioArtifact, MAX_SAMPLE_RATE_HZ, MIN_SAMPLE_RATE_HZ};
pub use image::{
    base64_unwrap, base64_wrap, encoded_to_tensor, tensor_to_encoded, EncodedImage, ImageMime,
    MediaTensor,
};
