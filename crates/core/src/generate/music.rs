//! Music generation over the prediction surface.

use crate::codec::{base64_unwrap, wav_to_audio, AudioArtifact};
use crate::error::{Error, Result};
use crate::models::LYRIA_MODEL_ID;
use crate::retry::{self, RetryPolicy};
use crate::service::PredictionService;
use serde_json::json;

/// A validated music-generation request.
#[derive(Debug, Clone)]
pub struct MusicRequest {
    /// Generation prompt
    pub prompt: String,
    /// Optional negative prompt
    pub negative_prompt: Option<String>,
    /// Number of clips to generate
    pub count: u32,
    /// Reproducibility seed; non-zero forces a single clip
    pub seed: Option<u32>,
}

impl MusicRequest {
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
        Ok(())
    }

    /// Effective clip count: a reproducible seed pins it to one.
    fn effective_count(&self) -> u32 {
        match self.seed {
            Some(seed) if seed != 0 => 1,
            _ => self.count,
        }
    }

    fn instance(&self) -> serde_json::Value {
        let mut instance = json!({
            "prompt": self.prompt,
            "sample_count": self.effective_count(),
        });
        if let Some(negative) = &self.negative_prompt {
            instance["negative_prompt"] = json!(negative);
        }
        if let Some(seed) = self.seed.filter(|s| *s != 0) {
            instance["seed"] = json!(seed);
        }
        instance
    }
}

/// Generate music clips and decode the WAV predictions.
pub async fn generate_music(
    service: &dyn PredictionService,
    policy: &RetryPolicy,
    request: &MusicRequest,
) -> Result<Vec<AudioArtifact>> {
    request.validate()?;
    let instances = json!([request.instance()]);

    tracing::info!(
        model = LYRIA_MODEL_ID,
        count = request.effective_count(),
        "generating music"
    );
    let predictions = retry::invoke(policy, LYRIA_MODEL_ID, || {
        service.predict(LYRIA_MODEL_ID, instances.clone(), json!({}))
    })
    .await?;

    if predictions.is_empty() {
        return Err(Error::TransientRemote(format!(
            "{LYRIA_MODEL_ID}: blocked by safety filters or empty"
        )));
    }

    let mut artifacts = Vec::with_capacity(predictions.len());
    for prediction in &predictions {
        let encoded = prediction["audioContent"]
            .as_str()
            .or_else(|| prediction["bytesBase64Encoded"].as_str())
            .ok_or_else(|| {
                Error::FileProcessing("prediction carries no audio content".into())
            })?;
        let wav_bytes = base64_unwrap(encoded)?;
        artifacts.push(wav_to_audio(&wav_bytes)?);
    }
    Ok(artifacts)
}
