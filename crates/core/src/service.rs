//! Service traits and wire types for the remote generative surfaces.
//!
//! The generators in [`crate::generate`] talk to these traits, never to
//! HTTP directly, so tests can substitute in-memory stubs. The `Http*`
//! implementations bind the traits to [`Client`]s from the factory.
//!
//! All methods return [`RemoteError`] rather than the crate error so
//! the retry wrapper can classify statuses before taxonomy mapping.

use crate::clients::Client;
use crate::error::{RemoteError, RemoteStatus};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};

fn ssml_tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<.*?>").unwrap())
}

fn markup_cue_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[.*?\]").unwrap())
}

/// One generated image returned from the image surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Base64-encoded image bytes
    pub bytes_base64_encoded: String,
    /// MIME type of the encoded bytes
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A long-running operation handle.
///
/// The payload under `response` is kept as raw JSON; its shape varies
/// by model family and is interpreted by the extraction probe list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Server-assigned operation name
    pub name: String,
    /// Whether the operation has completed
    #[serde(default)]
    pub done: bool,
    /// Completion payload, absent until done
    #[serde(default, alias = "result")]
    pub response: Option<Value>,
    /// Failure detail, absent unless the operation failed
    #[serde(default)]
    pub error: Option<OperationError>,
}

/// Failure recorded on a completed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    /// Canonical status code
    #[serde(default)]
    pub code: i64,
    /// Diagnostic message
    #[serde(default)]
    pub message: String,
}

/// Input text for speech synthesis, routed by classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SynthesisInput {
    /// Plain prose
    Text(String),
    /// SSML, detected by any angle-bracket tag
    Ssml(String),
    /// Markup with bracketed cue tags like `[sigh]`
    Markup(String),
}

impl SynthesisInput {
    /// Classify raw text into the right input field.
    ///
    /// Any `<…>` tag means SSML, even mid-sentence fragments like
    /// `hello <break time="1s"/> world`. Otherwise any `[…]` cue
    /// means markup. Everything else is plain text.
    pub fn classify(text: &str) -> Self {
        if ssml_tag_pattern().is_match(text) {
            SynthesisInput::Ssml(text.to_string())
        } else if markup_cue_pattern().is_match(text) {
            SynthesisInput::Markup(text.to_string())
        } else {
            SynthesisInput::Text(text.to_string())
        }
    }

    /// The raw text regardless of classification.
    pub fn as_text(&self) -> &str {
        match self {
            SynthesisInput::Text(t) | SynthesisInput::Ssml(t) | SynthesisInput::Markup(t) => t,
        }
    }
}

/// Voice selection for a synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSelection {
    /// BCP-47 language code, e.g. `en-US`
    pub language_code: String,
    /// Full voice name, e.g. `en-US-Chirp3-HD-Achernar`
    pub name: String,
    /// Model identifier for non-HD voices, omitted for HD names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
}

/// Audio output settings for a synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioConfig {
    /// Output encoding, always `LINEAR16` here
    pub audio_encoding: String,
    /// Requested sample rate, omitted to take the voice default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate_hertz: Option<u32>,
    /// Playback speed multiplier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaking_rate: Option<f64>,
    /// Output gain in dB
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_gain_db: Option<f64>,
}

/// A complete speech-synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    /// Text, SSML, or markup input
    pub input: SynthesisInput,
    /// Voice to render with
    pub voice: VoiceSelection,
    /// Output audio settings
    pub audio_config: AudioConfig,
    /// Optional style instruction for prompted models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

/// Image and video generation surface.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Synchronous image generation; one call returns the whole batch.
    async fn generate_images(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError>;

    /// Submit a video generation job, returning its operation handle.
    async fn start_video(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Operation, RemoteError>;

    /// Fetch the current state of a video operation.
    async fn fetch_operation(
        &self,
        model_id: &str,
        operation_name: &str,
    ) -> Result<Operation, RemoteError>;
}

/// Generic regional prediction surface (music).
#[async_trait]
pub trait PredictionService: Send + Sync {
    /// Run a predict call, returning the raw predictions array.
    async fn predict(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Vec<Value>, RemoteError>;
}

/// Text-to-speech surface.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Synthesize audio, returning the raw (WAV) bytes.
    async fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, RemoteError>;
}

/// [`GenerativeService`] over the regional generative endpoint.
pub struct HttpGenerativeService {
    client: Arc<Client>,
}

impl HttpGenerativeService {
    /// Wrap a client bound to the generative surface.
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn model_path(&self, model_id: &str, verb: &str) -> String {
        format!(
            "{}/publishers/google/models/{model_id}:{verb}",
            self.client.location_path()
        )
    }
}

#[async_trait]
impl GenerativeService for HttpGenerativeService {
    async fn generate_images(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Vec<GeneratedImage>, RemoteError> {
        let body = serde_json::json!({
            "instances": instances,
            "parameters": parameters,
        });
        let response = self
            .client
            .post_json(&self.model_path(model_id, "predict"), &body)
            .await?;
        parse_generated_images(&response)
    }

    async fn start_video(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Operation, RemoteError> {
        let body = serde_json::json!({
            "instances": instances,
            "parameters": parameters,
        });
        let response = self
            .client
            .post_json(&self.model_path(model_id, "predictLongRunning"), &body)
            .await?;
        serde_json::from_value(response).map_err(|e| {
            RemoteError::new(RemoteStatus::Unknown, format!("bad operation payload: {e}"))
        })
    }

    async fn fetch_operation(
        &self,
        model_id: &str,
        operation_name: &str,
    ) -> Result<Operation, RemoteError> {
        let body = serde_json::json!({ "operationName": operation_name });
        let response = self
            .client
            .post_json(&self.model_path(model_id, "fetchPredictOperation"), &body)
            .await?;
        serde_json::from_value(response).map_err(|e| {
            RemoteError::new(RemoteStatus::Unknown, format!("bad operation payload: {e}"))
        })
    }
}

fn parse_generated_images(response: &Value) -> Result<Vec<GeneratedImage>, RemoteError> {
    let predictions = response["predictions"].as_array().cloned().unwrap_or_default();
    let mut images = Vec::with_capacity(predictions.len());
    for prediction in predictions {
        // Entries without bytes (e.g. RAI placeholders) are skipped.
        if prediction.get("bytesBase64Encoded").is_none() {
            continue;
        }
        let image: GeneratedImage = serde_json::from_value(prediction).map_err(|e| {
            RemoteError::new(RemoteStatus::Unknown, format!("bad image prediction: {e}"))
        })?;
        images.push(image);
    }
    Ok(images)
}

/// [`PredictionService`] over the regional prediction endpoint.
pub struct HttpPredictionService {
    client: Arc<Client>,
}

impl HttpPredictionService {
    /// Wrap a client bound to the prediction surface.
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict(
        &self,
        model_id: &str,
        instances: Value,
        parameters: Value,
    ) -> Result<Vec<Value>, RemoteError> {
        let path = format!(
            "{}/publishers/google/models/{model_id}:predict",
            self.client.location_path()
        );
        let body = serde_json::json!({
            "instances": instances,
            "parameters": parameters,
        });
        let response = self.client.post_json(&path, &body).await?;
        Ok(response["predictions"].as_array().cloned().unwrap_or_default())
    }
}

/// [`SpeechService`] over the text-to-speech endpoint.
pub struct HttpSpeechService {
    client: Arc<Client>,
}

impl HttpSpeechService {
    /// Wrap a client bound to the text-to-speech surface.
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, RemoteError> {
        let body = serde_json::to_value(request).map_err(|e| {
            RemoteError::new(RemoteStatus::Unknown, format!("unserializable request: {e}"))
        })?;
        let response = self.client.post_json("text:synthesize", &body).await?;
        let encoded = response["audioContent"].as_str().ok_or_else(|| {
            RemoteError::new(
                RemoteStatus::Unknown,
                "synthesis response missing audioContent",
            )
        })?;
        crate::codec::base64_unwrap(encoded)
            .map_err(|e| RemoteError::new(RemoteStatus::Unknown, e.to_string()))
    }
}
