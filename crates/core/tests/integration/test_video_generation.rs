//! End-to-end video generation against stubbed LRO and store services.

use async_trait::async_trait;
use genmedia_core::codec::base64_wrap;
use genmedia_core::error::{Error, RemoteError};
use genmedia_core::generate::{
    video_from_blob, video_from_text, LroPhase, LroProgress, VideoEnv, VideoParams,
};
use parking_lot::Mutex;
use genmedia_core::models::{CompressionQuality, VideoModel};
use genmedia_core::retry::RetryPolicy;
use genmedia_core::service::{GeneratedImage, GenerativeService, Operation};
use genmedia_core::storage::{GcsUri, ObjectStore};
use genmedia_core::ErrorKind;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// LRO stub: submit returns a pending operation, fetches return the
/// configured payload once done.
struct StubLro {
    /// Number of fetches that report pending before done
    pending_fetches: u32,
    payload: Value,
    fetches: AtomicU32,
}

impl StubLro {
    fn done_after(pending_fetches: u32, payload: Value) -> Self {
        Self {
            pending_fetches,
            payload,
            fetches: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl GenerativeService for StubLro {
    async fn generate_images(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        unimplemented!("not used by video tests")
    }

    async fn start_video(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Operation, RemoteError> {
        Ok(Operation {
            name: "projects/p/operations/123".into(),
            done: false,
            response: None,
            error: None,
        })
    }

    async fn fetch_operation(
        &self,
        _model_id: &str,
        operation_name: &str,
    ) -> Result<Operation, RemoteError> {
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst);
        if fetch < self.pending_fetches {
            return Ok(Operation {
                name: operation_name.into(),
                done: false,
                response: None,
                error: None,
            });
        }
        Ok(Operation {
            name: operation_name.into(),
            done: true,
            response: Some(self.payload.clone()),
            error: None,
        })
    }
}

/// Store stub with one image object and download counting.
struct StubStore {
    video_bytes: Vec<u8>,
    downloads: AtomicU32,
}

impl StubStore {
    fn new(video_bytes: &[u8]) -> Self {
        Self {
            video_bytes: video_bytes.to_vec(),
            downloads: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ObjectStore for StubStore {
    async fn bucket_exists(&self, bucket: &str) -> genmedia_core::Result<bool> {
        Ok(bucket == "b")
    }

    async fn object_exists(&self, _bucket: &str, object: &str) -> genmedia_core::Result<bool> {
        Ok(object.ends_with(".png") || object.ends_with(".mp4"))
    }

    async fn content_type(
        &self,
        _bucket: &str,
        object: &str,
    ) -> genmedia_core::Result<Option<String>> {
        Ok(object.ends_with(".png").then(|| "image/png".to_string()))
    }

    async fn download(&self, _bucket: &str, _object: &str) -> genmedia_core::Result<Vec<u8>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(self.video_bytes.clone())
    }

    async fn upload(
        &self,
        _bucket: &str,
        _object: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> genmedia_core::Result<()> {
        Err(Error::Configuration("uploads not expected".into()))
    }
}

fn params() -> VideoParams {
    VideoParams {
        model: VideoModel::Veo31Preview,
        prompt: Some("pan".into()),
        aspect_ratio: "16:9".into(),
        duration_seconds: 8,
        count: 1,
        negative_prompt: None,
        seed: None,
        enhance_prompt: true,
        person_policy: None,
        generate_audio: false,
        resolution: None,
        compression: CompressionQuality::Optimized,
        output_uri: None,
        last_frame: None,
    }
}

fn env<'a>(
    service: &'a StubLro,
    store: &'a StubStore,
    policy: &'a RetryPolicy,
    temp_dir: &'a std::path::Path,
    poll_interval: Duration,
) -> VideoEnv<'a> {
    VideoEnv {
        service,
        store,
        policy,
        poll_interval,
        temp_dir,
        progress: None,
    }
}

#[tokio::test]
async fn blob_input_yields_inline_bytes_artifact() {
    let stub_bytes = b"not-really-an-mp4";
    let payload = json!({
        "generated_videos": [{"video": {"bytesBase64Encoded": base64_wrap(stub_bytes)}}]
    });
    let service = StubLro::done_after(0, payload);
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(3, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = env(&service, &store, &policy, dir.path(), Duration::from_millis(1));

    let uri = GcsUri::parse("gs://b/img.png").unwrap();
    let paths = video_from_blob(&env, &params(), &uri).await.unwrap();

    assert_eq!(paths.len(), 1);
    let name = paths[0].file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("veo_"), "unexpected name {name}");
    assert!(name.ends_with("_0.mp4"), "unexpected name {name}");
    assert_eq!(std::fs::read(&paths[0]).unwrap(), stub_bytes);
}

#[tokio::test]
async fn nested_response_shape_downloads_exactly_once() {
    let payload = json!({
        "generateVideoResponse": {
            "generated_videos": [{"video": {"uri": "gs://b/v.mp4"}}]
        }
    });
    let service = StubLro::done_after(0, payload);
    let store = StubStore::new(b"remote video bytes");
    let policy = RetryPolicy::new(3, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = env(&service, &store, &policy, dir.path(), Duration::from_millis(1));

    let paths = video_from_text(&env, &params()).await.unwrap();

    assert_eq!(paths.len(), 1);
    assert_eq!(store.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(std::fs::read(&paths[0]).unwrap(), b"remote video bytes");
}

#[tokio::test]
async fn done_on_first_fetch_never_sleeps() {
    let payload = json!({"generated_videos": [{"video": {"bytesBase64Encoded": base64_wrap(b"x")}}]});
    let service = StubLro::done_after(0, payload);
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(0, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    // A one-hour interval would trip the timeout if any sleep ran.
    let env = env(&service, &store, &policy, dir.path(), Duration::from_secs(3600));

    let paths = tokio::time::timeout(
        Duration::from_secs(5),
        video_from_text(&env, &params()),
    )
    .await
    .expect("poll loop slept despite done operation")
    .unwrap();

    assert_eq!(paths.len(), 1);
    assert_eq!(service.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pending_polls_repeat_until_done() {
    let payload = json!({"generated_videos": [{"video": {"bytesBase64Encoded": base64_wrap(b"x")}}]});
    let service = StubLro::done_after(2, payload);
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(0, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = env(&service, &store, &policy, dir.path(), Duration::from_millis(1));

    let paths = video_from_text(&env, &params()).await.unwrap();

    assert_eq!(paths.len(), 1);
    assert_eq!(service.fetches.load(Ordering::SeqCst), 3);
}

/// Generative stub that records the observed phase at each fetch.
struct PhaseWatchingLro {
    inner: StubLro,
    progress: Arc<Mutex<LroProgress>>,
    seen: Mutex<Vec<LroPhase>>,
}

#[async_trait]
impl GenerativeService for PhaseWatchingLro {
    async fn generate_images(
        &self,
        _model_id: &str,
        _instances: Value,
        _parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        unimplemented!("not used by video tests")
    }

    async fn start_video(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Operation, RemoteError> {
        self.seen.lock().push(self.progress.lock().phase());
        self.inner.start_video(model_id, instances, parameters).await
    }

    async fn fetch_operation(
        &self,
        model_id: &str,
        operation_name: &str,
    ) -> Result<Operation, RemoteError> {
        self.seen.lock().push(self.progress.lock().phase());
        self.inner.fetch_operation(model_id, operation_name).await
    }
}

#[tokio::test]
async fn phases_advance_on_the_underlying_events() {
    let payload = json!({"generated_videos": [{"video": {"bytesBase64Encoded": base64_wrap(b"x")}}]});
    let progress = Arc::new(Mutex::new(LroProgress::new("veo")));
    let service = PhaseWatchingLro {
        inner: StubLro::done_after(1, payload),
        progress: progress.clone(),
        seen: Mutex::new(Vec::new()),
    };
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(0, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = VideoEnv {
        service: &service,
        store: &store,
        policy: &policy,
        poll_interval: Duration::from_millis(1),
        temp_dir: dir.path(),
        progress: Some(progress.clone()),
    };

    video_from_text(&env, &params()).await.unwrap();

    // Submission saw Submitting; both fetches happened inside Polling.
    assert_eq!(
        *service.seen.lock(),
        vec![LroPhase::Submitting, LroPhase::Polling, LroPhase::Polling]
    );
    assert_eq!(progress.lock().phase(), LroPhase::Done);
}

#[tokio::test]
async fn failure_records_the_phase_where_it_happened() {
    let progress = Arc::new(Mutex::new(LroProgress::new("veo")));
    let service = StubLro::done_after(0, json!({"status": "ok"}));
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(0, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = VideoEnv {
        service: &service,
        store: &store,
        policy: &policy,
        poll_interval: Duration::from_millis(1),
        temp_dir: dir.path(),
        progress: Some(progress.clone()),
    };

    let err = video_from_text(&env, &params()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientRemote);
    assert_eq!(progress.lock().phase(), LroPhase::Failed("TransientRemote"));
}

#[tokio::test]
async fn lossless_without_sink_is_a_configuration_error() {
    let service = StubLro::done_after(0, json!({}));
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(0, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = env(&service, &store, &policy, dir.path(), Duration::from_millis(1));

    let mut p = params();
    p.compression = CompressionQuality::Lossless;
    let err = video_from_text(&env, &p).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("object-store sink"));
}

#[tokio::test]
async fn unrecognized_payload_is_transient_no_video_data() {
    let service = StubLro::done_after(0, json!({"status": "ok"}));
    let store = StubStore::new(b"");
    let policy = RetryPolicy::new(0, Duration::ZERO);
    let dir = tempfile::tempdir().unwrap();
    let env = env(&service, &store, &policy, dir.path(), Duration::from_millis(1));

    let err = video_from_text(&env, &params()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TransientRemote);
    assert!(err.to_string().contains("no video data"));
}
