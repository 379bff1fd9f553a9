//! Synchronous image generation.

use crate::codec::{base64_unwrap, encoded_to_tensor, EncodedImage, ImageMime, MediaTensor};
use crate::error::{Error, Result};
use crate::models::{ImageModel, PersonPolicy, SafetyFilterLevel};
use crate::retry::{self, RetryPolicy};
use crate::service::GenerativeService;
use ndarray::{concatenate, Axis};
use serde_json::json;

/// A validated image-generation request.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    /// Model tier to call
    pub model: ImageModel,
    /// Generation prompt
    pub prompt: String,
    /// Aspect ratio, from the tier's allowed set
    pub aspect_ratio: String,
    /// Number of images, 1 through the tier maximum
    pub count: u32,
    /// Output encoding
    pub mime: ImageMime,
    /// Optional negative prompt
    pub negative_prompt: Option<String>,
    /// Reproducibility seed; exclusive with `watermark`
    pub seed: Option<u32>,
    /// Whether to embed the invisible watermark
    pub watermark: bool,
    /// Whether the endpoint may rewrite the prompt
    pub enhance_prompt: bool,
    /// Person-generation policy
    pub person_policy: PersonPolicy,
    /// Safety filter strictness
    pub safety_level: SafetyFilterLevel,
    /// JPEG compression quality, ignored for PNG
    pub compression_quality: Option<u32>,
}

impl ImageRequest {
    fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::Input("prompt must not be empty".into()));
        }
        if !(1..=4).contains(&self.count) {
            return Err(Error::Input(format!(
                "count must be between 1 and 4, got {}",
                self.count
            )));
        }
        if self.count > self.model.max_images() {
            return Err(Error::Input(format!(
                "{} generates at most {} image(s) per call",
                self.model.model_id(),
                self.model.max_images()
            )));
        }
        if !self.model.allowed_aspect_ratios().contains(&self.aspect_ratio.as_str()) {
            return Err(Error::Input(format!(
                "aspect ratio {} is not supported by {}; allowed: {}",
                self.aspect_ratio,
                self.model.model_id(),
                self.model.allowed_aspect_ratios().join(", ")
            )));
        }
        if self.seed.is_some() && self.watermark {
            return Err(Error::Input(
                "seed and watermark are mutually exclusive; disable the watermark to use a seed"
                    .into(),
            ));
        }
        Ok(())
    }

    fn parameters(&self) -> serde_json::Value {
        let mut output_options = json!({ "mimeType": self.mime.as_str() });
        if self.mime == ImageMime::Jpeg {
            if let Some(quality) = self.compression_quality {
                output_options["compressionQuality"] = json!(quality);
            }
        }
        let mut parameters = json!({
            "sampleCount": self.count,
            "aspectRatio": self.aspect_ratio,
            "safetySetting": self.safety_level.as_str(),
            "personGeneration": self.person_policy.as_str(),
            "addWatermark": self.watermark,
            "enhancePrompt": self.enhance_prompt,
            "outputOptions": output_options,
        });
        if let Some(seed) = self.seed {
            parameters["seed"] = json!(seed);
        }
        if let Some(negative) = &self.negative_prompt {
            parameters["negativePrompt"] = json!(negative);
        }
        parameters
    }
}

/// Generate a batch of images and decode them to one stacked tensor.
///
/// The result is shaped `(count, H, W, 4)` with values in `[0,1]`;
/// decoding always expands to RGBA so downstream shapes are uniform.
pub async fn generate_images(
    service: &dyn GenerativeService,
    policy: &RetryPolicy,
    request: &ImageRequest,
) -> Result<MediaTensor> {
    request.validate()?;
    let model_id = request.model.model_id();
    let instances = json!([{ "prompt": request.prompt }]);
    let parameters = request.parameters();

    tracing::info!(model = model_id, count = request.count, "generating images");
    let generated = retry::invoke(policy, model_id, || {
        service.generate_images(model_id, instances.clone(), parameters.clone())
    })
    .await?;

    if generated.is_empty() {
        return Err(Error::TransientRemote(format!(
            "{model_id}: blocked by safety filters or empty"
        )));
    }

    let mut tensors = Vec::with_capacity(generated.len());
    for entry in &generated {
        let bytes = base64_unwrap(&entry.bytes_base64_encoded)?;
        let mime = match entry.mime_type.as_deref() {
            Some(m) => ImageMime::parse(m)?,
            None => request.mime,
        };
        tensors.push(encoded_to_tensor(&EncodedImage::new(bytes, mime))?);
    }

    let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
    concatenate(Axis(0), &views)
        .map_err(|e| Error::FileProcessing(format!("could not stack decoded images: {e}")))
}
