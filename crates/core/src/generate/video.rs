//! Video generation over the long-running-operation surface.
//!
//! Submission returns an operation handle that is polled at a fixed
//! interval until done. Completed payloads vary in shape across model
//! families, so extraction walks an ordered probe list and takes the
//! first non-empty match. Saved files land in the host temp directory
//! as `veo_<unix_seconds>_<rand>_<index>.mp4`.

use crate::codec::{base64_unwrap, tensor_to_encoded, EncodedImage, ImageMime, MediaTensor};
use crate::error::{Error, Result};
use crate::models::{CompressionQuality, PersonPolicy, VideoFamily, VideoModel, OUTPUT_RESOLUTIONS};
use crate::retry::{self, RetryPolicy};
use crate::service::{GenerativeService, Operation};
use crate::storage::{self, GcsUri, ObjectStore};
use ndarray::s;
use parking_lot::Mutex;
use rand::Rng;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Phase of a long-running video operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LroPhase {
    /// Not yet started
    Idle,
    /// Request submitted, awaiting acceptance
    Submitting,
    /// Operation accepted, polling until done
    Polling,
    /// Done; locating artifacts in the payload
    Extracting,
    /// Writing artifacts to the temp directory
    Persisting,
    /// At least one artifact written
    Done,
    /// Terminal failure, tagged with the taxonomy label
    Failed(&'static str),
}

impl LroPhase {
    /// Whether `next` is a legal forward transition from this phase.
    /// Any live phase may move to `Failed`; `Polling` may self-loop.
    pub fn can_advance_to(&self, next: LroPhase) -> bool {
        if matches!(next, LroPhase::Failed(_)) {
            return !matches!(self, LroPhase::Done | LroPhase::Failed(_));
        }
        matches!(
            (self, next),
            (LroPhase::Idle, LroPhase::Submitting)
                | (LroPhase::Submitting, LroPhase::Polling)
                | (LroPhase::Polling, LroPhase::Polling)
                | (LroPhase::Polling, LroPhase::Extracting)
                | (LroPhase::Extracting, LroPhase::Persisting)
                | (LroPhase::Persisting, LroPhase::Done)
        )
    }
}

/// Tracks and logs phase transitions for one operation.
///
/// The generator advances the tracker as the underlying events happen
/// (each poll tick self-loops through `Polling`), so a caller holding
/// the shared handle observes the live phase mid-operation.
#[derive(Debug)]
pub struct LroProgress {
    label: &'static str,
    phase: LroPhase,
}

impl LroProgress {
    /// Start a tracker in `Idle` under the given log label.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            phase: LroPhase::Idle,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> LroPhase {
        self.phase
    }

    /// Advance to the next phase; illegal transitions are an error.
    pub fn advance(&mut self, next: LroPhase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(Error::Unknown(format!(
                "illegal phase transition {:?} -> {next:?} in {}",
                self.phase, self.label
            )));
        }
        tracing::debug!(label = self.label, from = ?self.phase, to = ?next, "phase transition");
        self.phase = next;
        Ok(())
    }

    /// Record a terminal failure tagged with its taxonomy label.
    pub fn fail(&mut self, label: &'static str) {
        if self.phase.can_advance_to(LroPhase::Failed(label)) {
            tracing::debug!(label = self.label, from = ?self.phase, failure = label, "phase failed");
            self.phase = LroPhase::Failed(label);
        }
    }
}

/// Everything the video path needs besides the request itself.
pub struct VideoEnv<'a> {
    /// Generative surface for submit and poll
    pub service: &'a dyn GenerativeService,
    /// Object store for blob validation and URI downloads
    pub store: &'a dyn ObjectStore,
    /// Retry policy applied to submit and each poll
    pub policy: &'a RetryPolicy,
    /// Sleep between polls
    pub poll_interval: Duration,
    /// Host-owned directory for saved artifacts
    pub temp_dir: &'a Path,
    /// Shared phase tracker, advanced as the operation proceeds
    pub progress: Option<Arc<Mutex<LroProgress>>>,
}

impl VideoEnv<'_> {
    fn advance(&self, next: LroPhase) -> Result<()> {
        if let Some(progress) = &self.progress {
            progress.lock().advance(next)?;
        }
        Ok(())
    }

    fn fail(&self, label: &'static str) {
        if let Some(progress) = &self.progress {
            progress.lock().fail(label);
        }
    }
}

/// An image handed to the video endpoint, inline or by reference.
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Encoded bytes sent inline
    Inline(EncodedImage),
    /// Object already in the store
    Blob(GcsUri),
}

impl VideoSource {
    fn instance_value(&self) -> Result<Value> {
        match self {
            VideoSource::Inline(encoded) => Ok(json!({
                "bytesBase64Encoded": crate::codec::base64_wrap(&encoded.bytes),
                "mimeType": encoded.mime.as_str(),
            })),
            VideoSource::Blob(uri) => {
                let object = uri.object.as_deref().ok_or_else(|| {
                    Error::Configuration(format!("URI {uri} does not name an object"))
                })?;
                let mime = storage::mime_from_suffix(object).unwrap_or("image/png");
                Ok(json!({ "gcsUri": uri.to_uri(), "mimeType": mime }))
            }
        }
    }
}

/// Shared parameters for every video request variant.
#[derive(Debug, Clone)]
pub struct VideoParams {
    /// Model tier to call
    pub model: VideoModel,
    /// Generation prompt; required for the text-only path
    pub prompt: Option<String>,
    /// Aspect ratio, from the family's allowed set
    pub aspect_ratio: String,
    /// Clip length in seconds, from the family's allowed set
    pub duration_seconds: u32,
    /// Number of clips, 1 through the family maximum
    pub count: u32,
    /// Optional negative prompt
    pub negative_prompt: Option<String>,
    /// Reproducibility seed
    pub seed: Option<u32>,
    /// Whether the endpoint may rewrite the prompt
    pub enhance_prompt: bool,
    /// Person-generation policy
    pub person_policy: Option<PersonPolicy>,
    /// Soundtrack generation; v3 family only
    pub generate_audio: bool,
    /// Output resolution; v3 family only
    pub resolution: Option<String>,
    /// Output compression
    pub compression: CompressionQuality,
    /// Object-store sink; required for lossless compression
    pub output_uri: Option<GcsUri>,
    /// Final-frame interpolation target; v2 family only
    pub last_frame: Option<VideoSource>,
}

impl VideoParams {
    fn validate(&self) -> Result<()> {
        let model_id = self.model.model_id();
        if !self
            .model
            .allowed_aspect_ratios()
            .contains(&self.aspect_ratio.as_str())
        {
            return Err(Error::Input(format!(
                "aspect ratio {} is not supported by {model_id}; allowed: {}",
                self.aspect_ratio,
                self.model.allowed_aspect_ratios().join(", ")
            )));
        }
        if !self.model.allowed_durations().contains(&self.duration_seconds) {
            return Err(Error::Input(format!(
                "duration {}s is not supported by {model_id}; allowed: {:?}",
                self.duration_seconds,
                self.model.allowed_durations()
            )));
        }
        if !(1..=self.model.max_samples()).contains(&self.count) {
            return Err(Error::Input(format!(
                "count must be between 1 and {}, got {}",
                self.model.max_samples(),
                self.count
            )));
        }
        match self.model.family() {
            VideoFamily::V2 => {
                if self.generate_audio {
                    return Err(Error::Input(format!(
                        "{model_id} does not support audio generation"
                    )));
                }
                if self.resolution.is_some() {
                    return Err(Error::Input(format!(
                        "{model_id} does not accept an output resolution"
                    )));
                }
            }
            VideoFamily::V3 => {
                if self.last_frame.is_some() {
                    return Err(Error::Input(format!(
                        "{model_id} does not support last-frame interpolation"
                    )));
                }
                if let Some(resolution) = &self.resolution {
                    if !OUTPUT_RESOLUTIONS.contains(&resolution.as_str()) {
                        return Err(Error::Input(format!(
                            "resolution {resolution} is not supported; allowed: {}",
                            OUTPUT_RESOLUTIONS.join(", ")
                        )));
                    }
                }
            }
        }
        if self.compression == CompressionQuality::Lossless && self.output_uri.is_none() {
            return Err(Error::Configuration(
                "lossless output requires an object-store sink".into(),
            ));
        }
        Ok(())
    }

    fn parameters(&self) -> serde_json::Value {
        let mut parameters = json!({
            "sampleCount": self.count,
            "aspectRatio": self.aspect_ratio,
            "durationSeconds": self.duration_seconds,
            "enhancePrompt": self.enhance_prompt,
            "compressionQuality": self.compression.as_str(),
        });
        if let Some(policy) = self.person_policy {
            parameters["personGeneration"] = json!(policy.as_str());
        }
        if let Some(negative) = &self.negative_prompt {
            parameters["negativePrompt"] = json!(negative);
        }
        if let Some(seed) = self.seed {
            parameters["seed"] = json!(seed);
        }
        if let Some(uri) = &self.output_uri {
            parameters["storageUri"] = json!(uri.to_uri());
        }
        if self.model.family() == VideoFamily::V3 {
            parameters["generateAudio"] = json!(self.generate_audio);
            if let Some(resolution) = &self.resolution {
                parameters["resolution"] = json!(resolution);
            }
        }
        parameters
    }
}

/// Generate video from a prompt alone.
pub async fn video_from_text(env: &VideoEnv<'_>, params: &VideoParams) -> Result<Vec<PathBuf>> {
    params.validate()?;
    let prompt = params
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::Input("prompt must not be empty".into()))?;
    let instance = json!({ "prompt": prompt });
    run(env, params, instance).await
}

/// Generate video conditioned on a first-frame image.
pub async fn video_from_image(
    env: &VideoEnv<'_>,
    params: &VideoParams,
    image: &VideoSource,
) -> Result<Vec<PathBuf>> {
    params.validate()?;
    let mut instance = json!({ "image": image.instance_value()? });
    if let Some(prompt) = params.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        instance["prompt"] = json!(prompt);
    }
    if let Some(last_frame) = &params.last_frame {
        instance["lastFrame"] = last_frame.instance_value()?;
    }
    run(env, params, instance).await
}

/// Generate video from an image already in the object store.
///
/// The blob is validated (bucket, object, `image/*` content) before
/// submission.
pub async fn video_from_blob(
    env: &VideoEnv<'_>,
    params: &VideoParams,
    uri: &GcsUri,
) -> Result<Vec<PathBuf>> {
    storage::validate(env.store, uri, true, true).await?;
    video_from_image(env, params, &VideoSource::Blob(uri.clone())).await
}

/// Generate video guided by 1..=3 reference image tensors.
///
/// Each tensor batch is flattened frame-by-frame into encoded images
/// before submission.
pub async fn video_from_references(
    env: &VideoEnv<'_>,
    params: &VideoParams,
    references: &[MediaTensor],
) -> Result<Vec<PathBuf>> {
    params.validate()?;
    if references.is_empty() || references.len() > 3 {
        return Err(Error::Input(format!(
            "between 1 and 3 reference images are required, got {}",
            references.len()
        )));
    }
    let mut reference_images = Vec::new();
    for tensor in references {
        for frame_index in 0..tensor.shape()[0] {
            let frame = tensor
                .slice(s![frame_index..frame_index + 1, .., .., ..])
                .to_owned();
            let encoded = tensor_to_encoded(&frame, ImageMime::Png)?;
            reference_images.push(json!({
                "image": VideoSource::Inline(encoded).instance_value()?,
                "referenceType": "asset",
            }));
        }
    }
    let mut instance = json!({ "referenceImages": reference_images });
    if let Some(prompt) = params.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        instance["prompt"] = json!(prompt);
    }
    run(env, params, instance).await
}

async fn run(env: &VideoEnv<'_>, params: &VideoParams, instance: Value) -> Result<Vec<PathBuf>> {
    match run_phases(env, params, instance).await {
        Ok(paths) => Ok(paths),
        Err(e) => {
            env.fail(e.kind().label());
            Err(e)
        }
    }
}

async fn run_phases(
    env: &VideoEnv<'_>,
    params: &VideoParams,
    instance: Value,
) -> Result<Vec<PathBuf>> {
    let model_id = params.model.model_id();
    let instances = json!([instance]);
    let parameters = params.parameters();

    env.advance(LroPhase::Submitting)?;
    tracing::info!(model = model_id, count = params.count, "submitting video generation");
    let operation = retry::invoke(env.policy, model_id, || {
        env.service
            .start_video(model_id, instances.clone(), parameters.clone())
    })
    .await?;
    env.advance(LroPhase::Polling)?;

    let operation = poll_until_done(env, model_id, operation).await?;
    let payload = finished_payload(model_id, operation)?;
    env.advance(LroPhase::Extracting)?;
    let entries = extract_videos(&payload)?;
    env.advance(LroPhase::Persisting)?;
    let saved = persist(env, model_id, &entries).await?;
    env.advance(LroPhase::Done)?;
    Ok(saved)
}

async fn poll_until_done(
    env: &VideoEnv<'_>,
    model_id: &str,
    mut operation: Operation,
) -> Result<Operation> {
    while !operation.done {
        env.advance(LroPhase::Polling)?;
        let name = operation.name.clone();
        let fetched = retry::invoke(env.policy, model_id, || {
            env.service.fetch_operation(model_id, &name)
        })
        .await;
        operation = match fetched {
            Ok(op) => op,
            // Exhausted-retry outcomes keep their own codes.
            Err(e @ (Error::QuotaExhausted(_) | Error::Unavailable(_))) => return Err(e),
            Err(e) => {
                return Err(Error::TransientRemote(format!(
                    "{model_id}: operation poll failed: {e}"
                )))
            }
        };
        if operation.done {
            break;
        }
        tracing::debug!(model = model_id, operation = %operation.name, "operation pending");
        tokio::time::sleep(env.poll_interval).await;
    }
    Ok(operation)
}

fn finished_payload(model_id: &str, operation: Operation) -> Result<Value> {
    if let Some(error) = operation.error {
        return Err(match error.code {
            3 => Error::Input(format!("{model_id}: {}", error.message)),
            5 => Error::NotFound(format!("{model_id}: {}", error.message)),
            7 => Error::PermissionDenied(format!("{model_id}: {}", error.message)),
            8 => Error::QuotaExhausted(format!("{model_id}: {}", error.message)),
            _ => Error::TransientRemote(format!(
                "{model_id}: operation failed: {}",
                error.message
            )),
        });
    }
    operation
        .response
        .ok_or_else(|| Error::TransientRemote(format!("{model_id}: no video data")))
}

type Probe = fn(&Value) -> Option<Vec<Value>>;

fn non_empty(values: Vec<Value>) -> Option<Vec<Value>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn probe_generated_videos(payload: &Value) -> Option<Vec<Value>> {
    non_empty(payload.get("generated_videos")?.as_array()?.clone())
}

fn probe_nested_generated_videos(payload: &Value) -> Option<Vec<Value>> {
    let nested = payload.get("generateVideoResponse")?;
    non_empty(nested.get("generated_videos")?.as_array()?.clone())
}

fn probe_wrapped_response(payload: &Value) -> Option<Vec<Value>> {
    let nested = payload.get("generateVideoResponse")?;
    if nested.is_null() {
        return None;
    }
    Some(vec![nested.clone()])
}

fn probe_payload_is_list(payload: &Value) -> Option<Vec<Value>> {
    non_empty(payload.as_array()?.clone())
}

fn probe_payload_has_video(payload: &Value) -> Option<Vec<Value>> {
    payload.get("video")?;
    Some(vec![payload.clone()])
}

/// Ordered probes over the completed payload; first non-empty wins.
static VIDEO_PROBES: &[(&str, Probe)] = &[
    ("generated_videos", probe_generated_videos),
    (
        "generateVideoResponse.generated_videos",
        probe_nested_generated_videos,
    ),
    ("generateVideoResponse", probe_wrapped_response),
    ("payload-list", probe_payload_is_list),
    ("payload-video", probe_payload_has_video),
];

fn extract_videos(payload: &Value) -> Result<Vec<Value>> {
    for (name, probe) in VIDEO_PROBES {
        if let Some(entries) = probe(payload) {
            tracing::debug!(probe = name, count = entries.len(), "matched video payload shape");
            return Ok(entries);
        }
    }
    Err(Error::TransientRemote("no video data".into()))
}

fn artifact_path(temp_dir: &Path, index: usize) -> PathBuf {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let tag: u32 = rand::thread_rng().gen_range(1000..=99999);
    temp_dir.join(format!("veo_{seconds}_{tag}_{index}.mp4"))
}

fn inline_bytes(entry: &Value) -> Option<&str> {
    entry
        .pointer("/video/bytesBase64Encoded")
        .and_then(Value::as_str)
}

fn entry_uri(entry: &Value) -> Option<&str> {
    entry
        .pointer("/video/uri")
        .or_else(|| entry.pointer("/video/gcsUri"))
        .or_else(|| entry.get("uri"))
        .or_else(|| entry.get("gcsUri"))
        .and_then(Value::as_str)
}

fn raw_bytes(entry: &Value) -> Option<&str> {
    entry.get("bytesBase64Encoded").and_then(Value::as_str)
}

async fn persist(
    env: &VideoEnv<'_>,
    model_id: &str,
    entries: &[Value],
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(env.temp_dir).await.map_err(|e| {
        Error::FileProcessing(format!(
            "could not create artifact directory {}: {e}",
            env.temp_dir.display()
        ))
    })?;

    let mut saved = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let path = artifact_path(env.temp_dir, index);
        if let Some(encoded) = inline_bytes(entry) {
            let bytes = base64_unwrap(encoded)?;
            tokio::fs::write(&path, bytes).await?;
        } else if let Some(uri) = entry_uri(entry) {
            let parsed = match GcsUri::parse(uri) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(model = model_id, index, uri, "skipping unusable video URI: {e}");
                    continue;
                }
            };
            storage::download_to_file(env.store, &parsed, &path).await?;
        } else if let Some(encoded) = raw_bytes(entry) {
            let bytes = base64_unwrap(encoded)?;
            tokio::fs::write(&path, bytes).await?;
        } else {
            tracing::warn!(model = model_id, index, "skipping video entry with no usable source");
            continue;
        }
        tracing::info!(model = model_id, path = %path.display(), "saved video artifact");
        saved.push(path);
    }

    if saved.is_empty() {
        return Err(Error::TransientRemote(format!(
            "{model_id}: no video artifacts could be saved"
        )));
    }
    Ok(saved)
}
