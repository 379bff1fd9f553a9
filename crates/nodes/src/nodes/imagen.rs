//! Image generation node.

use crate::node::{MediaNode, NodeError, NodeHost, NodeInputs, NodeResult, NodeValue};
use crate::schema::{InputSpec, NodeSchema, SemanticType};
use async_trait::async_trait;
use genmedia_core::codec::ImageMime;
use genmedia_core::generate::{generate_images, ImageRequest};
use genmedia_core::models::{ImageModel, PersonPolicy, SafetyFilterLevel, MAX_SEED};
use serde_json::json;
use uuid::Uuid;

/// Synchronous text-to-image node.
pub struct ImagenNode;

const NODE_NAME: &str = "imagen_generate";

fn image_model(id: &str) -> NodeResult<ImageModel> {
    match id {
        "imagen-3.0-generate-002" => Ok(ImageModel::Imagen3),
        "imagen-4.0-generate-preview-06-06" => Ok(ImageModel::Imagen4Preview),
        "imagen-4.0-fast-generate-preview-06-06" => Ok(ImageModel::Imagen4FastPreview),
        "imagen-4.0-ultra-generate-preview-06-06" => Ok(ImageModel::Imagen4UltraPreview),
        other => Err(NodeError::Runtime {
            label: "Input",
            message: format!("unknown image model '{other}'"),
        }),
    }
}

pub(crate) fn person_policy(value: &str) -> NodeResult<PersonPolicy> {
    match value {
        "allow_adult" => Ok(PersonPolicy::AllowAdult),
        "allow_all" => Ok(PersonPolicy::AllowAll),
        "dont_allow" => Ok(PersonPolicy::DontAllow),
        other => Err(NodeError::Runtime {
            label: "Input",
            message: format!("unknown person policy '{other}'"),
        }),
    }
}

pub(crate) fn safety_level(value: &str) -> NodeResult<SafetyFilterLevel> {
    match value {
        "BLOCK_NONE" => Ok(SafetyFilterLevel::BlockNone),
        "BLOCK_ONLY_HIGH" => Ok(SafetyFilterLevel::BlockOnlyHigh),
        "BLOCK_MEDIUM_AND_ABOVE" => Ok(SafetyFilterLevel::BlockMediumAndAbove),
        "BLOCK_LOW_AND_ABOVE" => Ok(SafetyFilterLevel::BlockLowAndAbove),
        other => Err(NodeError::Runtime {
            label: "Input",
            message: format!("unknown safety filter level '{other}'"),
        }),
    }
}

/// Seed inputs arrive as integers; zero means unset.
pub(crate) fn seed_from(value: i64) -> NodeResult<Option<u32>> {
    match value {
        0 => Ok(None),
        v if v > 0 && v <= MAX_SEED as i64 => Ok(Some(v as u32)),
        v => Err(NodeError::Runtime {
            label: "Input",
            message: format!("seed {v} is outside [0, {MAX_SEED}]"),
        }),
    }
}

#[async_trait]
impl MediaNode for ImagenNode {
    fn schema(&self) -> NodeSchema {
        NodeSchema {
            name: NODE_NAME.into(),
            category: "GenMedia/Image".into(),
            inputs: vec![
                InputSpec::required("prompt", SemanticType::Text),
                InputSpec::optional(
                    "model",
                    SemanticType::ModelIdentifier,
                    json!("imagen-3.0-generate-002"),
                ),
                InputSpec::optional(
                    "aspect_ratio",
                    SemanticType::Enum(
                        ImageModel::Imagen3
                            .allowed_aspect_ratios()
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                    json!("1:1"),
                ),
                InputSpec::optional("count", SemanticType::Integer, json!(1))
                    .describe("Number of images, 1-4"),
                InputSpec::optional(
                    "mime",
                    SemanticType::Enum(vec!["image/png".into(), "image/jpeg".into()]),
                    json!("image/png"),
                ),
                InputSpec::optional("negative_prompt", SemanticType::Text, json!("")),
                InputSpec::optional("seed", SemanticType::Integer, json!(0))
                    .describe("0 leaves the seed unset"),
                InputSpec::optional("watermark", SemanticType::Boolean, json!(true)),
                InputSpec::optional("enhance_prompt", SemanticType::Boolean, json!(true)),
                InputSpec::optional(
                    "person_generation",
                    SemanticType::Enum(vec![
                        "allow_adult".into(),
                        "allow_all".into(),
                        "dont_allow".into(),
                    ]),
                    json!("allow_adult"),
                ),
                InputSpec::optional(
                    "safety_filter_level",
                    SemanticType::Enum(vec![
                        "BLOCK_NONE".into(),
                        "BLOCK_ONLY_HIGH".into(),
                        "BLOCK_MEDIUM_AND_ABOVE".into(),
                        "BLOCK_LOW_AND_ABOVE".into(),
                    ]),
                    json!("BLOCK_MEDIUM_AND_ABOVE"),
                ),
                InputSpec::optional("compression_quality", SemanticType::Integer, json!(75))
                    .describe("JPEG quality, ignored for PNG"),
            ],
            outputs: vec![SemanticType::ImageTensor],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = NODE_NAME, %invocation, "executing");

        let model = image_model(inputs.text_opt("model")?.unwrap_or("imagen-3.0-generate-002"))?;
        let mime = ImageMime::parse(inputs.text_opt("mime")?.unwrap_or("image/png"))
            .map_err(NodeError::from)?;
        let request = ImageRequest {
            model,
            prompt: inputs.text("prompt")?.to_string(),
            aspect_ratio: inputs.text_opt("aspect_ratio")?.unwrap_or("1:1").to_string(),
            count: inputs.integer_or("count", 1)?.max(0) as u32,
            mime,
            negative_prompt: inputs.text_opt("negative_prompt")?.map(str::to_string),
            seed: seed_from(inputs.integer_or("seed", 0)?)?,
            watermark: inputs.boolean_or("watermark", true)?,
            enhance_prompt: inputs.boolean_or("enhance_prompt", true)?,
            person_policy: person_policy(inputs.text_opt("person_generation")?.unwrap_or("allow_adult"))?,
            safety_level: safety_level(
                inputs
                    .text_opt("safety_filter_level")?
                    .unwrap_or("BLOCK_MEDIUM_AND_ABOVE"),
            )?,
            compression_quality: Some(inputs.integer_or("compression_quality", 75)?.max(0) as u32),
        };

        let tensor = generate_images(host.generative.as_ref(), &host.policy, &request).await?;
        Ok(vec![NodeValue::Image(tensor)])
    }
}
