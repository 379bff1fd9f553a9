//! WAV parsing into host-native audio artifacts.

use crate::error::{Error, Result};
use hound::{SampleFormat, WavReader};
use ndarray::Array3;
use std::io::Cursor;

/// Lowest sample rate the speech/music surfaces produce.
pub const MIN_SAMPLE_RATE_HZ: u32 = 8_000;
/// Highest sample rate the speech/music surfaces produce.
pub const MAX_SAMPLE_RATE_HZ: u32 = 48_000;

/// A decoded audio payload.
///
/// `waveform` is `(1, channels, samples)` with float values in
/// `[-1, 1]`; `sample_rate_hz` lies in `[8000, 48000]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    /// Normalized waveform, `(1, channels, samples)`
    pub waveform: Array3<f32>,
    /// Sample rate reported by the WAV header
    pub sample_rate_hz: u32,
}

impl AudioArtifact {
    /// Number of channels in the waveform.
    pub fn channels(&self) -> usize {
        self.waveform.dim().1
    }

    /// Number of samples per channel.
    pub fn samples(&self) -> usize {
        self.waveform.dim().2
    }
}

/// Parse a WAV byte payload into an [`AudioArtifact`].
///
/// Supports 8-bit unsigned and 16-bit signed PCM; other sample widths
/// and malformed headers are `FileProcessing` failures.
pub fn wav_to_audio(bytes: &[u8]) -> Result<AudioArtifact> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| Error::FileProcessing(format!("failed to read WAV header: {e}")))?;
    let spec = reader.spec();

    if spec.sample_rate < MIN_SAMPLE_RATE_HZ || spec.sample_rate > MAX_SAMPLE_RATE_HZ {
        return Err(Error::FileProcessing(format!(
            "sample rate {} Hz outside supported range [{MIN_SAMPLE_RATE_HZ}, {MAX_SAMPLE_RATE_HZ}]",
            spec.sample_rate
        )));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32_768.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::FileProcessing(format!("failed to read WAV frames: {e}")))?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::FileProcessing(format!("failed to read WAV frames: {e}")))?,
        (format, bits) => {
            return Err(Error::FileProcessing(format!(
                "unsupported WAV sample format {format:?} at {bits} bits"
            )))
        }
    };

    let channels = spec.channels as usize;
    if channels == 0 || interleaved.len() % channels != 0 {
        return Err(Error::FileProcessing(format!(
            "WAV frame count {} does not divide into {channels} channels",
            interleaved.len()
        )));
    }
    let samples = interleaved.len() / channels;

    // De-interleave into (1, channels, samples).
    let mut waveform = Array3::<f32>::zeros((1, channels, samples));
    for (i, value) in interleaved.iter().enumerate() {
        waveform[(0, i % channels, i / channels)] = *value;
    }

    Ok(AudioArtifact {
        waveform,
        sample_rate_hz: spec.sample_rate,
    })
}
