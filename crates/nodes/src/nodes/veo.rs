//! Video generation nodes over the long-running-operation path.

use crate::node::{
    LroProgress, MediaNode, NodeError, NodeHost, NodeInputs, NodeResult, NodeValue,
};
use crate::nodes::imagen::{person_policy, seed_from};
use crate::schema::{InputSpec, NodeSchema, SemanticType};
use async_trait::async_trait;
use genmedia_core::codec::{tensor_to_encoded, ImageMime};
use genmedia_core::generate::{
    video_from_blob, video_from_image, video_from_references, video_from_text, VideoEnv,
    VideoParams, VideoSource,
};
use genmedia_core::models::{CompressionQuality, VideoModel, OUTPUT_RESOLUTIONS};
use genmedia_core::storage::GcsUri;
use parking_lot::Mutex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

fn video_model(id: &str) -> NodeResult<VideoModel> {
    match id {
        "veo-2.0-generate-001" => Ok(VideoModel::Veo2),
        "veo-3.1-generate-preview" => Ok(VideoModel::Veo31Preview),
        "veo-3.1-fast-generate-preview" => Ok(VideoModel::Veo31FastPreview),
        other => Err(NodeError::Runtime {
            label: "Input",
            message: format!("unknown video model '{other}'"),
        }),
    }
}

fn shared_inputs() -> Vec<InputSpec> {
    vec![
        InputSpec::optional(
            "model",
            SemanticType::ModelIdentifier,
            json!("veo-3.1-generate-preview"),
        ),
        InputSpec::optional(
            "aspect_ratio",
            SemanticType::Enum(vec!["16:9".into(), "9:16".into()]),
            json!("16:9"),
        ),
        InputSpec::optional("duration_seconds", SemanticType::Integer, json!(8)),
        InputSpec::optional("count", SemanticType::Integer, json!(1)),
        InputSpec::optional("negative_prompt", SemanticType::Text, json!("")),
        InputSpec::optional("seed", SemanticType::Integer, json!(0)),
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
        InputSpec::optional("generate_audio", SemanticType::Boolean, json!(false))
            .describe("veo 3.x only"),
        InputSpec::optional(
            "resolution",
            SemanticType::Enum(OUTPUT_RESOLUTIONS.iter().map(|s| s.to_string()).collect()),
            json!(""),
        )
        .describe("veo 3.x only; empty takes the endpoint default"),
        InputSpec::optional(
            "compression",
            SemanticType::Enum(vec!["optimized".into(), "lossless".into()]),
            json!("optimized"),
        ),
        InputSpec::optional("output_gcs_uri", SemanticType::BlobUri, json!(""))
            .describe("required for lossless output"),
    ]
}

fn parse_params(inputs: &NodeInputs, require_prompt: bool) -> NodeResult<VideoParams> {
    let model = video_model(inputs.text_opt("model")?.unwrap_or("veo-3.1-generate-preview"))?;
    let prompt = inputs.text_opt("prompt")?.map(str::to_string);
    if require_prompt && prompt.is_none() {
        return Err(NodeError::Runtime {
            label: "Input",
            message: "prompt must not be empty".into(),
        });
    }
    let compression = match inputs.text_opt("compression")?.unwrap_or("optimized") {
        "lossless" => CompressionQuality::Lossless,
        _ => CompressionQuality::Optimized,
    };
    let output_uri = match inputs.text_opt("output_gcs_uri")? {
        Some(uri) => Some(GcsUri::parse(uri).map_err(NodeError::from)?),
        None => None,
    };
    Ok(VideoParams {
        model,
        prompt,
        aspect_ratio: inputs.text_opt("aspect_ratio")?.unwrap_or("16:9").to_string(),
        duration_seconds: inputs.integer_or("duration_seconds", 8)?.max(0) as u32,
        count: inputs.integer_or("count", 1)?.max(0) as u32,
        negative_prompt: inputs.text_opt("negative_prompt")?.map(str::to_string),
        seed: seed_from(inputs.integer_or("seed", 0)?)?,
        enhance_prompt: inputs.boolean_or("enhance_prompt", true)?,
        person_policy: Some(person_policy(
            inputs.text_opt("person_generation")?.unwrap_or("allow_adult"),
        )?),
        generate_audio: inputs.boolean_or("generate_audio", false)?,
        resolution: inputs.text_opt("resolution")?.map(str::to_string),
        compression,
        output_uri,
        last_frame: None,
    })
}

/// Await one LRO call whose phases the generator advances live on the
/// shared tracker; map the outcome into node values.
async fn run_lro<F>(progress: Arc<Mutex<LroProgress>>, call: F) -> NodeResult<Vec<NodeValue>>
where
    F: std::future::Future<Output = genmedia_core::Result<Vec<PathBuf>>>,
{
    match call.await {
        Ok(paths) => Ok(vec![NodeValue::Paths(paths)]),
        Err(err) => {
            let node_err = NodeError::from(err);
            // Validation failures never reach the generator, so the
            // tracker may still be Idle here.
            progress.lock().fail(node_err.label());
            Err(node_err)
        }
    }
}

fn env_of<'a>(host: &'a NodeHost, progress: &Arc<Mutex<LroProgress>>) -> VideoEnv<'a> {
    VideoEnv {
        service: host.generative.as_ref(),
        store: host.store.as_ref(),
        policy: &host.policy,
        poll_interval: host.poll_interval,
        temp_dir: &host.temp_dir,
        progress: Some(progress.clone()),
    }
}

/// Text-to-video node.
pub struct VeoTextNode;

#[async_trait]
impl MediaNode for VeoTextNode {
    fn schema(&self) -> NodeSchema {
        let mut inputs = vec![InputSpec::required("prompt", SemanticType::Text)];
        inputs.extend(shared_inputs());
        NodeSchema {
            name: "veo_text_to_video".into(),
            category: "GenMedia/Video".into(),
            inputs,
            outputs: vec![SemanticType::FilePaths],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = "veo_text_to_video", %invocation, "executing");
        let params = parse_params(inputs, true)?;
        let progress = Arc::new(Mutex::new(LroProgress::new("veo_text_to_video")));
        let env = env_of(host, &progress);
        run_lro(progress, video_from_text(&env, &params)).await
    }
}

/// Image-to-video node; the first frame comes from a tensor or a blob.
pub struct VeoImageNode;

#[async_trait]
impl MediaNode for VeoImageNode {
    fn schema(&self) -> NodeSchema {
        let mut inputs = vec![
            InputSpec::optional("image", SemanticType::ImageTensor, json!(null))
                .describe("first frame; alternative to image_gcs_uri"),
            InputSpec::optional("image_gcs_uri", SemanticType::BlobUri, json!("")),
            InputSpec::optional("last_frame", SemanticType::ImageTensor, json!(null))
                .describe("veo 2.x only"),
            InputSpec::optional("prompt", SemanticType::Text, json!("")),
        ];
        inputs.extend(shared_inputs());
        NodeSchema {
            name: "veo_image_to_video".into(),
            category: "GenMedia/Video".into(),
            inputs,
            outputs: vec![SemanticType::FilePaths],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = "veo_image_to_video", %invocation, "executing");
        let mut params = parse_params(inputs, false)?;
        if let Some(tensor) = inputs.image_opt("last_frame")? {
            let encoded = tensor_to_encoded(tensor, ImageMime::Png).map_err(NodeError::from)?;
            params.last_frame = Some(VideoSource::Inline(encoded));
        }

        let progress = Arc::new(Mutex::new(LroProgress::new("veo_image_to_video")));
        let env = env_of(host, &progress);
        if let Some(tensor) = inputs.image_opt("image")? {
            let encoded = tensor_to_encoded(tensor, ImageMime::Png).map_err(NodeError::from)?;
            let source = VideoSource::Inline(encoded);
            return run_lro(progress, video_from_image(&env, &params, &source)).await;
        }
        if let Some(uri) = inputs.text_opt("image_gcs_uri")? {
            let parsed = GcsUri::parse(uri).map_err(NodeError::from)?;
            return run_lro(progress, video_from_blob(&env, &params, &parsed)).await;
        }
        Err(NodeError::Runtime {
            label: "Input",
            message: "either image or image_gcs_uri is required".into(),
        })
    }
}

/// References-to-video node; up to three asset images steer the clip.
pub struct VeoReferencesNode;

#[async_trait]
impl MediaNode for VeoReferencesNode {
    fn schema(&self) -> NodeSchema {
        let mut inputs = vec![
            InputSpec::required("prompt", SemanticType::Text),
            InputSpec::required("reference_1", SemanticType::ImageTensor),
            InputSpec::optional("reference_2", SemanticType::ImageTensor, json!(null)),
            InputSpec::optional("reference_3", SemanticType::ImageTensor, json!(null)),
        ];
        inputs.extend(shared_inputs());
        NodeSchema {
            name: "veo_references_to_video".into(),
            category: "GenMedia/Video".into(),
            inputs,
            outputs: vec![SemanticType::FilePaths],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = "veo_references_to_video", %invocation, "executing");
        let params = parse_params(inputs, true)?;
        let mut references = vec![inputs.image("reference_1")?.clone()];
        for name in ["reference_2", "reference_3"] {
            if let Some(tensor) = inputs.image_opt(name)? {
                references.push(tensor.clone());
            }
        }
        let progress = Arc::new(Mutex::new(LroProgress::new("veo_references_to_video")));
        let env = env_of(host, &progress);
        run_lro(
            progress.clone(),
            video_from_references(&env, &params, &references),
        )
        .await
    }
}
