//! Model identifier enums and per-surface constants.
//!
//! Model families are closed sets; each family declares the aspect
//! ratios, durations, and sample counts its endpoints accept.

use serde::{Deserialize, Serialize};

/// User-agent stamped on image-generation requests.
pub const IMAGEN_USER_AGENT: &str = "cloud-solutions/imagen-custom-node-v1";
/// User-agent stamped on video-generation requests.
pub const VEO_USER_AGENT: &str = "cloud-solutions/veo-custom-node-v1";
/// User-agent stamped on speech-synthesis requests.
pub const TTS_USER_AGENT: &str = "cloud-solutions/tts-custom-node-v1";
/// User-agent stamped on music-generation requests.
pub const LYRIA_USER_AGENT: &str = "cloud-solutions/lyria-custom-node-v1";
/// User-agent stamped on virtual try-on requests.
pub const TRY_ON_USER_AGENT: &str = "cloud-solutions/virtual-try-on-custom-node-v1";
/// User-agent stamped on object-store requests.
pub const STORAGE_USER_AGENT: &str = "cloud-solutions/gcs-custom-node-v1";

/// Largest seed value accepted by the generation endpoints.
pub const MAX_SEED: u32 = 0xFFFF_FFFF;

/// Video resolutions the v3 family can produce.
pub const OUTPUT_RESOLUTIONS: &[&str] = &["720p", "1080p"];

/// Image-generation model tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageModel {
    /// Imagen 3 general tier
    Imagen3,
    /// Imagen 4 preview tier
    Imagen4Preview,
    /// Imagen 4 fast preview tier
    Imagen4FastPreview,
    /// Imagen 4 ultra preview tier (single image per call)
    Imagen4UltraPreview,
}

impl ImageModel {
    /// Wire identifier of this tier.
    pub fn model_id(&self) -> &'static str {
        match self {
            ImageModel::Imagen3 => "imagen-3.0-generate-002",
            ImageModel::Imagen4Preview => "imagen-4.0-generate-preview-06-06",
            ImageModel::Imagen4FastPreview => "imagen-4.0-fast-generate-preview-06-06",
            ImageModel::Imagen4UltraPreview => "imagen-4.0-ultra-generate-preview-06-06",
        }
    }

    /// Aspect ratios this tier accepts.
    pub fn allowed_aspect_ratios(&self) -> &'static [&'static str] {
        &["1:1", "16:9", "4:3", "3:4", "9:16"]
    }

    /// The ultra tier only generates one image at a time.
    pub fn max_images(&self) -> u32 {
        match self {
            ImageModel::Imagen4UltraPreview => 1,
            _ => 4,
        }
    }
}

/// Video model generation family; the families differ in which config
/// fields the endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFamily {
    /// veo-2.0 endpoints: `last_frame` interpolation, no audio
    V2,
    /// veo-3.x endpoints: `generate_audio` + `resolution`
    V3,
}

/// Video-generation model tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoModel {
    /// Veo 2 general tier
    Veo2,
    /// Veo 3.1 preview tier
    Veo31Preview,
    /// Veo 3.1 fast preview tier
    Veo31FastPreview,
}

impl VideoModel {
    /// Wire identifier of this tier.
    pub fn model_id(&self) -> &'static str {
        match self {
            VideoModel::Veo2 => "veo-2.0-generate-001",
            VideoModel::Veo31Preview => "veo-3.1-generate-preview",
            VideoModel::Veo31FastPreview => "veo-3.1-fast-generate-preview",
        }
    }

    /// The config-shape family of this tier.
    pub fn family(&self) -> VideoFamily {
        match self {
            VideoModel::Veo2 => VideoFamily::V2,
            VideoModel::Veo31Preview | VideoModel::Veo31FastPreview => VideoFamily::V3,
        }
    }

    /// Aspect ratios this family accepts.
    pub fn allowed_aspect_ratios(&self) -> &'static [&'static str] {
        match self.family() {
            VideoFamily::V2 => &["16:9", "9:16"],
            VideoFamily::V3 => &["16:9"],
        }
    }

    /// Durations (seconds) this family accepts. The v3 endpoint
    /// rejects everything but 8 s clips.
    pub fn allowed_durations(&self) -> &'static [u32] {
        match self.family() {
            VideoFamily::V2 => &[5, 6, 7, 8],
            VideoFamily::V3 => &[8],
        }
    }

    /// Number of samples a single call may request.
    pub fn max_samples(&self) -> u32 {
        4
    }
}

/// Speech-synthesis model families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechModel {
    /// Chirp 3 HD voices; voice id is `<language>-<model>-<voice>`
    Chirp3Hd,
    /// Gemini pro TTS; model name travels as a sibling field
    GeminiProTts,
    /// Gemini flash TTS; model name travels as a sibling field
    GeminiFlashTts,
}

impl SpeechModel {
    /// Wire identifier of this model.
    pub fn model_id(&self) -> &'static str {
        match self {
            SpeechModel::Chirp3Hd => "Chirp3-HD",
            SpeechModel::GeminiProTts => "gemini-2.5-pro-tts",
            SpeechModel::GeminiFlashTts => "gemini-2.5-flash-tts",
        }
    }

    /// Whether the fully-qualified voice id embeds the model name.
    pub fn is_hd_family(&self) -> bool {
        matches!(self, SpeechModel::Chirp3Hd)
    }
}

/// The music-generation model.
pub const LYRIA_MODEL_ID: &str = "lyria-002";

/// The virtual try-on model.
pub const TRY_ON_MODEL_ID: &str = "virtual-try-on-preview-08-04";

/// Safety filter strictness for image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyFilterLevel {
    /// No blocking
    BlockNone,
    /// Block only high-confidence violations
    BlockOnlyHigh,
    /// Block medium and above (endpoint default)
    BlockMediumAndAbove,
    /// Block low and above
    BlockLowAndAbove,
}

impl SafetyFilterLevel {
    /// Wire value for the request config.
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyFilterLevel::BlockNone => "BLOCK_NONE",
            SafetyFilterLevel::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            SafetyFilterLevel::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            SafetyFilterLevel::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }
}

/// Person-generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonPolicy {
    /// Allow adult depictions
    AllowAdult,
    /// Allow all depictions
    AllowAll,
    /// Disallow people entirely
    DontAllow,
}

impl PersonPolicy {
    /// Wire value for the request config.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonPolicy::AllowAdult => "allow_adult",
            PersonPolicy::AllowAll => "allow_all",
            PersonPolicy::DontAllow => "dont_allow",
        }
    }
}

/// Video compression quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionQuality {
    /// Endpoint-optimized output
    Optimized,
    /// Lossless output; requires an object-store sink
    Lossless,
}

impl CompressionQuality {
    /// Wire value for the request config.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionQuality::Optimized => "OPTIMIZED",
            CompressionQuality::Lossless => "LOSSLESS",
        }
    }
}
