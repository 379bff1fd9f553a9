//! Pixel-tensor and byte-payload image codecs.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use ndarray::Array4;
use std::io::Cursor;

/// Host-native pixel tensor: `(batch, height, width, channels)`,
/// float values in `[0, 1]`, channel count 3 or 4.
pub type MediaTensor = Array4<f32>;

/// MIME types the image codec supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
}

impl ImageMime {
    /// The MIME string for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
        }
    }

    /// Parse a MIME string; only PNG and JPEG are supported.
    pub fn parse(mime: &str) -> Result<Self> {
        match mime {
            "image/png" => Ok(ImageMime::Png),
            "image/jpeg" | "image/jpg" => Ok(ImageMime::Jpeg),
            other => Err(Error::Input(format!(
                "unsupported image mime type '{other}'"
            ))),
        }
    }

    fn format(&self) -> ImageFormat {
        match self {
            ImageMime::Png => ImageFormat::Png,
            ImageMime::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// An encoded image byte payload with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Encoded bytes
    pub bytes: Vec<u8>,
    /// Declared format of `bytes`
    pub mime: ImageMime,
}

impl EncodedImage {
    /// Wrap bytes with a declared MIME type.
    pub fn new(bytes: Vec<u8>, mime: ImageMime) -> Self {
        Self { bytes, mime }
    }
}

/// Encode one tensor frame to image bytes.
///
/// A leading batch dimension of size 1 is squeezed away; a larger
/// batch is rejected (callers encode frame-by-frame). Float values are
/// scaled to 8-bit. JPEG output drops any alpha channel.
pub fn tensor_to_encoded(tensor: &MediaTensor, mime: ImageMime) -> Result<EncodedImage> {
    let (batch, height, width, channels) = tensor.dim();
    if batch != 1 {
        return Err(Error::FileProcessing(format!(
            "expected a single-frame tensor, got batch size {batch}"
        )));
    }
    if channels != 3 && channels != 4 {
        return Err(Error::FileProcessing(format!(
            "expected 3 or 4 channels, got {channels}"
        )));
    }

    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    // JPEG has no alpha; RGB is the common denominator there.
    let dynamic = if channels == 4 && mime == ImageMime::Png {
        let mut raw = Vec::with_capacity(height * width * 4);
        for y in 0..height {
            for x in 0..width {
                for c in 0..4 {
                    raw.push(to_u8(tensor[(0, y, x, c)]));
                }
            }
        }
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width as u32, height as u32, raw)
                .ok_or_else(|| Error::FileProcessing("pixel buffer shape mismatch".into()))?;
        DynamicImage::ImageRgba8(buffer)
    } else {
        let mut raw = Vec::with_capacity(height * width * 3);
        for y in 0..height {
            for x in 0..width {
                for c in 0..3 {
                    raw.push(to_u8(tensor[(0, y, x, c)]));
                }
            }
        }
        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width as u32, height as u32, raw)
                .ok_or_else(|| Error::FileProcessing("pixel buffer shape mismatch".into()))?;
        DynamicImage::ImageRgb8(buffer)
    };

    let mut bytes = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut bytes, mime.format())
        .map_err(|e| Error::FileProcessing(format!("image encode failed: {e}")))?;

    Ok(EncodedImage::new(bytes.into_inner(), mime))
}

/// Decode image bytes to a `(1, H, W, 4)` RGBA tensor in `[0, 1]`.
///
/// Always expands to RGBA so downstream shapes are deterministic
/// regardless of the source format.
pub fn encoded_to_tensor(encoded: &EncodedImage) -> Result<MediaTensor> {
    let decoded = image::load_from_memory_with_format(&encoded.bytes, encoded.mime.format())
        .map_err(|e| Error::FileProcessing(format!("image decode failed: {e}")))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = (rgba.width() as usize, rgba.height() as usize);

    let mut tensor = Array4::<f32>::zeros((1, height, width, 4));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        for c in 0..4 {
            tensor[(0, y as usize, x as usize, c)] = pixel.0[c] as f32 / 255.0;
        }
    }
    Ok(tensor)
}

/// Base64-encode a byte payload for wire transport.
pub fn base64_wrap(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode a base64-wrapped payload.
pub fn base64_unwrap(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::FileProcessing(format!("base64 decode failed: {e}")))
}
