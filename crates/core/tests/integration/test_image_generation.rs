//! End-to-end image generation against a stubbed generative service.

use async_trait::async_trait;
use genmedia_core::codec::{base64_wrap, tensor_to_encoded, ImageMime};
use genmedia_core::error::RemoteError;
use genmedia_core::generate::{generate_images, ImageRequest};
use genmedia_core::models::{ImageModel, PersonPolicy, SafetyFilterLevel};
use genmedia_core::retry::RetryPolicy;
use genmedia_core::service::{GeneratedImage, GenerativeService, Operation};
use genmedia_core::ErrorKind;
use ndarray::Array4;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns a fixed list of generated images and records request bodies.
struct StubGenerative {
    images: Vec<GeneratedImage>,
    calls: AtomicU32,
    last_parameters: Mutex<Option<Value>>,
}

impl StubGenerative {
    fn returning(images: Vec<GeneratedImage>) -> Self {
        Self {
            images,
            calls: AtomicU32::new(0),
            last_parameters: Mutex::new(None),
        }
    }
}

#[async_trait]
impl GenerativeService for StubGenerative {
    async fn generate_images(
        &self,
        _model_id: &str,
        _instances: Value,
        parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_parameters.lock().unwrap() = Some(parameters);
        Ok(self.images.clone())
    }

    async fn start_video(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Operation, RemoteError> {
        unimplemented!("not used by image tests")
    }

    async fn fetch_operation(
        &self,
        _model_id: &str,
        _operation_name: &str,
    ) -> Result<Operation, RemoteError> {
        unimplemented!("not used by image tests")
    }
}

fn png_image(width: usize, height: usize, level: f32) -> GeneratedImage {
    let tensor = Array4::from_elem((1, height, width, 3), level);
    let encoded = tensor_to_encoded(&tensor, ImageMime::Png).unwrap();
    GeneratedImage {
        bytes_base64_encoded: base64_wrap(&encoded.bytes),
        mime_type: Some("image/png".to_string()),
    }
}

fn request(count: u32) -> ImageRequest {
    ImageRequest {
        model: ImageModel::Imagen3,
        prompt: "a red apple".into(),
        aspect_ratio: "1:1".into(),
        count,
        mime: ImageMime::Png,
        negative_prompt: None,
        seed: None,
        watermark: false,
        enhance_prompt: true,
        person_policy: PersonPolicy::AllowAdult,
        safety_level: SafetyFilterLevel::BlockMediumAndAbove,
        compression_quality: None,
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

#[tokio::test]
async fn happy_path_returns_stacked_batch_tensor() {
    let stub = StubGenerative::returning(vec![png_image(8, 8, 0.25), png_image(8, 8, 0.75)]);

    let tensor = generate_images(&stub, &policy(), &request(2)).await.unwrap();

    assert_eq!(tensor.shape(), &[2, 8, 8, 4]);
    assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    // Decoded frames keep their order and distinct brightness.
    assert!(tensor[(0, 0, 0, 0)] < tensor[(1, 0, 0, 0)]);
}

#[tokio::test]
async fn out_of_range_count_is_rejected_before_any_call() {
    let stub = StubGenerative::returning(vec![]);
    let err = generate_images(&stub, &policy(), &request(5)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().contains("count must be between 1 and 4"));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_remote_batch_surfaces_as_transient() {
    let stub = StubGenerative::returning(vec![]);
    let err = generate_images(&stub, &policy(), &request(1)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TransientRemote);
    assert!(err.to_string().contains("blocked by safety filters or empty"));
}

#[tokio::test]
async fn request_parameters_reach_the_wire() {
    let stub = StubGenerative::returning(vec![png_image(4, 4, 0.5)]);
    let mut r = request(1);
    r.seed = Some(1234);
    r.negative_prompt = Some("bruises".into());

    generate_images(&stub, &policy(), &r).await.unwrap();

    let parameters = stub.last_parameters.lock().unwrap().clone().unwrap();
    assert_eq!(parameters["seed"], 1234);
    assert_eq!(parameters["negativePrompt"], "bruises");
    assert_eq!(parameters["sampleCount"], 1);
    assert_eq!(parameters["addWatermark"], false);
}
