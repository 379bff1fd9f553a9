//! Node contract surface against stubbed services.

use async_trait::async_trait;
use genmedia_core::codec::{base64_wrap, tensor_to_encoded, ImageMime};
use genmedia_core::error::{RemoteError, RemoteStatus};
use genmedia_core::models::TRY_ON_MODEL_ID;
use genmedia_core::retry::RetryPolicy;
use genmedia_core::service::{
    GeneratedImage, GenerativeService, Operation, PredictionService, SpeechService,
    SynthesizeRequest,
};
use genmedia_core::storage::ObjectStore;
use genmedia_nodes::{NodeHost, NodeInputs, NodeRegistry, NodeValue};
use ndarray::Array4;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn png_image() -> GeneratedImage {
    let tensor = Array4::from_elem((1, 4, 4, 3), 0.5);
    let encoded = tensor_to_encoded(&tensor, ImageMime::Png).unwrap();
    GeneratedImage {
        bytes_base64_encoded: base64_wrap(&encoded.bytes),
        mime_type: Some("image/png".into()),
    }
}

fn wav_bytes() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..64 {
            writer.write_sample((i as i16) * 10).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// One stub implementing every remote surface.
struct StubServices {
    image_failure: Option<RemoteStatus>,
}

#[async_trait]
impl GenerativeService for StubServices {
    async fn generate_images(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        if let Some(status) = self.image_failure {
            return Err(RemoteError::new(status, "rejected by endpoint"));
        }
        Ok(vec![png_image(), png_image()])
    }

    async fn start_video(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Operation, RemoteError> {
        Ok(Operation {
            name: "op/1".into(),
            done: true,
            response: Some(json!({
                "generated_videos": [{"video": {"bytesBase64Encoded": base64_wrap(b"clip")}}]
            })),
            error: None,
        })
    }

    async fn fetch_operation(
        &self,
        _model_id: &str,
        _operation_name: &str,
    ) -> Result<Operation, RemoteError> {
        unimplemented!("submission already completes")
    }
}

#[async_trait]
impl PredictionService for StubServices {
    async fn predict(
        &self,
        model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Vec<Value>, RemoteError> {
        if model_id == TRY_ON_MODEL_ID {
            let image = png_image();
            return Ok(vec![json!({
                "bytesBase64Encoded": image.bytes_base64_encoded,
                "mimeType": "image/png",
            })]);
        }
        Ok(vec![json!({"audioContent": base64_wrap(&wav_bytes())})])
    }
}

#[async_trait]
impl SpeechService for StubServices {
    async fn synthesize(&self, _request: &SynthesizeRequest) -> Result<Vec<u8>, RemoteError> {
        Ok(wav_bytes())
    }
}

#[async_trait]
impl ObjectStore for StubServices {
    async fn bucket_exists(&self, _bucket: &str) -> genmedia_core::Result<bool> {
        Ok(true)
    }
    async fn object_exists(&self, _bucket: &str, _object: &str) -> genmedia_core::Result<bool> {
        Ok(true)
    }
    async fn content_type(
        &self,
        _bucket: &str,
        _object: &str,
    ) -> genmedia_core::Result<Option<String>> {
        Ok(Some("image/png".into()))
    }
    async fn download(&self, _bucket: &str, _object: &str) -> genmedia_core::Result<Vec<u8>> {
        Ok(b"clip".to_vec())
    }
    async fn upload(
        &self,
        _bucket: &str,
        _object: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> genmedia_core::Result<()> {
        Ok(())
    }
}

fn host(temp_dir: &std::path::Path, image_failure: Option<RemoteStatus>) -> NodeHost {
    let services = Arc::new(StubServices { image_failure });
    NodeHost {
        generative: services.clone(),
        prediction: services.clone(),
        speech: services.clone(),
        store: services,
        policy: RetryPolicy::new(0, Duration::ZERO),
        poll_interval: Duration::from_millis(1),
        temp_dir: temp_dir.to_path_buf(),
    }
}

#[tokio::test]
async fn imagen_node_returns_one_image_tensor() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("imagen_generate").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set("prompt", NodeValue::Text("a red apple".into()));
    inputs.set("count", NodeValue::Integer(2));

    let outputs = node.execute(&host, &inputs).await?;
    assert_eq!(outputs.len(), 1);
    match &outputs[0] {
        NodeValue::Image(tensor) => {
            assert_eq!(tensor.shape(), &[2, 4, 4, 4]);
            assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
        }
        other => panic!("unexpected output {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn core_errors_reach_the_host_with_taxonomy_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), Some(RemoteStatus::InvalidArgument));
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("imagen_generate").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set("prompt", NodeValue::Text("x".into()));

    let err = node.execute(&host, &inputs).await.unwrap_err();
    assert_eq!(err.label(), "Input");
    assert!(err.to_string().starts_with("[Input]"));
    assert!(err.to_string().contains("rejected by endpoint"));
}

#[tokio::test]
async fn veo_text_node_writes_artifacts_into_the_temp_dir() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("veo_text_to_video").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set("prompt", NodeValue::Text("pan over hills".into()));

    let outputs = node.execute(&host, &inputs).await.unwrap();
    match &outputs[0] {
        NodeValue::Paths(paths) => {
            assert_eq!(paths.len(), 1);
            assert!(paths[0].starts_with(dir.path()));
            assert_eq!(std::fs::read(&paths[0]).unwrap(), b"clip");
        }
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn veo_references_node_accepts_asset_tensors() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("veo_references_to_video").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set("prompt", NodeValue::Text("the subject walks away".into()));
    inputs.set(
        "reference_1",
        NodeValue::Image(Array4::from_elem((1, 4, 4, 3), 0.2)),
    );
    inputs.set(
        "reference_2",
        NodeValue::Image(Array4::from_elem((1, 4, 4, 3), 0.8)),
    );

    let outputs = node.execute(&host, &inputs).await.unwrap();
    match &outputs[0] {
        NodeValue::Paths(paths) => assert_eq!(paths.len(), 1),
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn try_on_node_stacks_one_image_per_product() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("virtual_try_on").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set(
        "person_image",
        NodeValue::Image(Array4::from_elem((1, 4, 4, 3), 0.3)),
    );
    inputs.set(
        "product_image",
        NodeValue::Image(Array4::from_elem((2, 4, 4, 3), 0.7)),
    );

    let outputs = node.execute(&host, &inputs).await.unwrap();
    match &outputs[0] {
        NodeValue::Image(tensor) => assert_eq!(tensor.shape(), &[2, 4, 4, 4]),
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn try_on_node_rejects_seed_with_watermark() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("virtual_try_on").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set(
        "person_image",
        NodeValue::Image(Array4::from_elem((1, 4, 4, 3), 0.3)),
    );
    inputs.set(
        "product_image",
        NodeValue::Image(Array4::from_elem((1, 4, 4, 3), 0.7)),
    );
    inputs.set("seed", NodeValue::Integer(9));
    inputs.set("watermark", NodeValue::Boolean(true));

    let err = node.execute(&host, &inputs).await.unwrap_err();
    assert_eq!(err.label(), "Input");
}

#[tokio::test]
async fn tts_node_returns_a_decoded_audio_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("tts_synthesize").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set("text", NodeValue::Text("<speak>hi</speak>".into()));

    let outputs = node.execute(&host, &inputs).await.unwrap();
    match &outputs[0] {
        NodeValue::Audio(artifact) => {
            assert_eq!(artifact.sample_rate_hz, 24_000);
            assert_eq!(artifact.channels(), 1);
        }
        other => panic!("unexpected output {other:?}"),
    }
}

#[tokio::test]
async fn lyria_node_returns_one_artifact_per_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("lyria_generate").unwrap();

    let mut inputs = NodeInputs::new();
    inputs.set("prompt", NodeValue::Text("ambient".into()));

    let outputs = node.execute(&host, &inputs).await.unwrap();
    assert_eq!(outputs.len(), 1);
    assert!(matches!(outputs[0], NodeValue::Audio(_)));
}

#[tokio::test]
async fn missing_required_input_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let host = host(dir.path(), None);
    let registry = NodeRegistry::with_builtin_nodes();
    let node = registry.get("imagen_generate").unwrap();

    let err = node.execute(&host, &NodeInputs::new()).await.unwrap_err();
    assert_eq!(err.label(), "Input");
    assert!(err.to_string().contains("missing required input 'prompt'"));
}
