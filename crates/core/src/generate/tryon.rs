//! Virtual try-on over the prediction surface.
//!
//! One call per product frame: the person image travels with every
//! instance while the product batch is split frame-by-frame. Failed
//! products are skipped so one rejection does not sink the batch.

use crate::codec::{
    base64_unwrap, base64_wrap, encoded_to_tensor, tensor_to_encoded, EncodedImage, ImageMime,
    MediaTensor,
};
use crate::error::{Error, Result};
use crate::models::{PersonPolicy, SafetyFilterLevel, TRY_ON_MODEL_ID};
use crate::retry::{self, RetryPolicy};
use crate::service::PredictionService;
use ndarray::{concatenate, s, Axis};
use serde_json::json;

/// A validated try-on request.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    /// Person image; only the first frame is used
    pub person: MediaTensor,
    /// Product batch; each frame becomes one call
    pub products: MediaTensor,
    /// Diffusion base steps, 1 through 50
    pub base_steps: u32,
    /// Images generated per product
    pub count: u32,
    /// Reproducibility seed; exclusive with `watermark`
    pub seed: Option<u32>,
    /// Whether to embed the invisible watermark
    pub watermark: bool,
    /// Person-generation policy
    pub person_policy: PersonPolicy,
    /// Safety filter strictness
    pub safety_level: SafetyFilterLevel,
}

impl TryOnRequest {
    fn validate(&self) -> Result<()> {
        if self.person.is_empty() || self.products.is_empty() {
            return Err(Error::Input(
                "person and product images must be non-empty".into(),
            ));
        }
        if !(1..=50).contains(&self.base_steps) {
            return Err(Error::Input(format!(
                "base steps must be between 1 and 50, got {}",
                self.base_steps
            )));
        }
        if !(1..=4).contains(&self.count) {
            return Err(Error::Input(format!(
                "count must be between 1 and 4, got {}",
                self.count
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
        let mut parameters = json!({
            "sampleCount": self.count,
            "baseSteps": self.base_steps,
            "safetySetting": self.safety_level.as_str(),
            "personGeneration": self.person_policy.as_str(),
            "addWatermark": self.watermark,
        });
        if let Some(seed) = self.seed {
            parameters["seed"] = json!(seed);
        }
        parameters
    }
}

fn frame_base64(tensor: &MediaTensor, index: usize) -> Result<String> {
    let frame = tensor.slice(s![index..index + 1, .., .., ..]).to_owned();
    let encoded = tensor_to_encoded(&frame, ImageMime::Png)?;
    Ok(base64_wrap(&encoded.bytes))
}

/// Run try-on for every product frame and stack the generated images.
///
/// The result is shaped `(n, H, W, 4)` with values in `[0,1]`. Products
/// whose call fails are skipped with a warning; an empty final batch is
/// `TransientRemote`.
pub async fn generate_try_on(
    service: &dyn PredictionService,
    policy: &RetryPolicy,
    request: &TryOnRequest,
) -> Result<MediaTensor> {
    request.validate()?;
    let person = frame_base64(&request.person, 0)?;
    let parameters = request.parameters();
    let product_count = request.products.shape()[0];

    tracing::info!(model = TRY_ON_MODEL_ID, products = product_count, "running try-on batch");
    let mut tensors = Vec::new();
    for index in 0..product_count {
        let product = frame_base64(&request.products, index)?;
        let instances = json!([{
            "personImage": { "image": { "bytesBase64Encoded": person } },
            "productImages": [{ "image": { "bytesBase64Encoded": product } }],
        }]);
        let predictions = match retry::invoke(policy, TRY_ON_MODEL_ID, || {
            service.predict(TRY_ON_MODEL_ID, instances.clone(), parameters.clone())
        })
        .await
        {
            Ok(predictions) => predictions,
            Err(e) => {
                tracing::warn!(model = TRY_ON_MODEL_ID, index, "skipping failed product: {e}");
                continue;
            }
        };
        for prediction in &predictions {
            let encoded = prediction
                .get("bytesBase64Encoded")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    Error::TransientRemote(format!("{TRY_ON_MODEL_ID}: prediction without bytes"))
                })?;
            let mime = prediction
                .get("mimeType")
                .and_then(serde_json::Value::as_str)
                .map(ImageMime::parse)
                .transpose()?
                .unwrap_or(ImageMime::Png);
            let bytes = base64_unwrap(encoded)?;
            tensors.push(encoded_to_tensor(&EncodedImage::new(bytes, mime))?);
        }
    }

    if tensors.is_empty() {
        return Err(Error::TransientRemote(format!(
            "{TRY_ON_MODEL_ID}: no try-on images were generated"
        )));
    }
    let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
    concatenate(Axis(0), &views)
        .map_err(|e| Error::FileProcessing(format!("could not stack decoded images: {e}")))
}
