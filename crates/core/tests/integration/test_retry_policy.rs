//! Retry behavior across the generation paths.

use async_trait::async_trait;
use genmedia_core::codec::{base64_wrap, tensor_to_encoded, ImageMime};
use genmedia_core::error::{RemoteError, RemoteStatus};
use genmedia_core::generate::{generate_images, ImageRequest};
use genmedia_core::models::{ImageModel, PersonPolicy, SafetyFilterLevel};
use genmedia_core::retry::RetryPolicy;
use genmedia_core::service::{GeneratedImage, GenerativeService, Operation};
use genmedia_core::ErrorKind;
use ndarray::Array4;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Fails with the given status a fixed number of times, then succeeds.
struct FlakyGenerative {
    failures: u32,
    status: RemoteStatus,
    calls: AtomicU32,
}

impl FlakyGenerative {
    fn new(failures: u32, status: RemoteStatus) -> Self {
        Self {
            failures,
            status,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl GenerativeService for FlakyGenerative {
    async fn generate_images(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RemoteError::new(self.status, "backend busy"));
        }
        let tensor = Array4::from_elem((1, 4, 4, 3), 0.5);
        let encoded = tensor_to_encoded(&tensor, ImageMime::Png).unwrap();
        Ok(vec![GeneratedImage {
            bytes_base64_encoded: base64_wrap(&encoded.bytes),
            mime_type: Some("image/png".into()),
        }])
    }

    async fn start_video(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Operation, RemoteError> {
        unimplemented!("not used by retry tests")
    }

    async fn fetch_operation(
        &self,
        _model_id: &str,
        _operation_name: &str,
    ) -> Result<Operation, RemoteError> {
        unimplemented!("not used by retry tests")
    }
}

fn request() -> ImageRequest {
    ImageRequest {
        model: ImageModel::Imagen3,
        prompt: "x".into(),
        aspect_ratio: "1:1".into(),
        count: 1,
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

#[tokio::test]
async fn two_unavailable_failures_then_success_takes_three_attempts() {
    let stub = FlakyGenerative::new(2, RemoteStatus::Unavailable);
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let tensor = generate_images(&stub, &policy, &request()).await.unwrap();

    assert_eq!(tensor.shape()[0], 1);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_unavailable_surfaces_as_unavailable() {
    let stub = FlakyGenerative::new(10, RemoteStatus::Unavailable);
    let policy = RetryPolicy::new(2, Duration::ZERO);

    let err = generate_images(&stub, &policy, &request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.to_string().contains("retries exhausted"));
    assert!(err.to_string().contains("backend busy"));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_quota_surfaces_as_quota_exhausted() {
    let stub = FlakyGenerative::new(10, RemoteStatus::ResourceExhausted);
    let policy = RetryPolicy::new(1, Duration::ZERO);

    let err = generate_images(&stub, &policy, &request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::QuotaExhausted);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn terminal_codes_do_not_retry() {
    let cases = [
        (RemoteStatus::InvalidArgument, ErrorKind::Input),
        (RemoteStatus::PermissionDenied, ErrorKind::PermissionDenied),
        (RemoteStatus::DeadlineExceeded, ErrorKind::Timeout),
        (RemoteStatus::NotFound, ErrorKind::NotFound),
    ];
    for (status, expected) in cases {
        let stub = FlakyGenerative::new(10, status);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let err = generate_images(&stub, &policy, &request()).await.unwrap_err();

        assert_eq!(err.kind(), expected, "status {status:?}");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1, "status {status:?}");
    }
}

#[tokio::test]
async fn error_messages_are_tagged_with_the_model_label() {
    let stub = FlakyGenerative::new(10, RemoteStatus::Unavailable);
    let policy = RetryPolicy::new(0, Duration::ZERO);

    let err = generate_images(&stub, &policy, &request()).await.unwrap_err();
    assert!(err.to_string().contains("imagen-3.0-generate-002"));
}
