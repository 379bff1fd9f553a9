//! Speech synthesis.

use crate::codec::{wav_to_audio, AudioArtifact};
use crate::error::{Error, Result};
use crate::models::SpeechModel;
use crate::retry::{self, RetryPolicy};
use crate::service::{
    AudioConfig, SpeechService, SynthesisInput, SynthesizeRequest, VoiceSelection,
};

/// A validated speech-synthesis request.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Model family to synthesize with
    pub model: SpeechModel,
    /// Raw text; classified into text/ssml/markup at dispatch
    pub text: String,
    /// BCP-47 language code, e.g. `en-US`
    pub language_code: String,
    /// Short voice name, e.g. `Achernar`
    pub voice: String,
    /// Requested sample rate; omitted takes the voice default
    pub sample_rate_hz: Option<u32>,
    /// Playback speed multiplier
    pub speaking_rate: Option<f64>,
    /// Output gain in dB
    pub volume_gain_db: Option<f64>,
    /// Style instruction; only prompted (non-HD) models accept it
    pub prompt: Option<String>,
}

impl SpeechRequest {
    fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::Input("text must not be empty".into()));
        }
        if self.language_code.trim().is_empty() || self.voice.trim().is_empty() {
            return Err(Error::Input("language and voice are required".into()));
        }
        if let Some(rate) = self.sample_rate_hz {
            if !(crate::codec::MIN_SAMPLE_RATE_HZ..=crate::codec::MAX_SAMPLE_RATE_HZ)
                .contains(&rate)
            {
                return Err(Error::Input(format!(
                    "sample rate {rate} is outside [{}, {}]",
                    crate::codec::MIN_SAMPLE_RATE_HZ,
                    crate::codec::MAX_SAMPLE_RATE_HZ
                )));
            }
        }
        if let Some(speed) = self.speaking_rate {
            if !(0.25..=4.0).contains(&speed) {
                return Err(Error::Input(format!(
                    "speaking rate {speed} is outside [0.25, 4.0]"
                )));
            }
        }
        if let Some(gain) = self.volume_gain_db {
            if !(-96.0..=16.0).contains(&gain) {
                return Err(Error::Input(format!(
                    "volume gain {gain} dB is outside [-96, 16]"
                )));
            }
        }
        if self.prompt.is_some() && self.model.is_hd_family() {
            return Err(Error::Input(format!(
                "{} voices do not accept a style prompt",
                self.model.model_id()
            )));
        }
        Ok(())
    }

    /// Fully-qualified voice selection for this model family.
    ///
    /// HD voices embed the model in the voice name; prompted models
    /// keep the short name and carry the model as a sibling field.
    fn voice_selection(&self) -> VoiceSelection {
        if self.model.is_hd_family() {
            VoiceSelection {
                language_code: self.language_code.clone(),
                name: format!(
                    "{}-{}-{}",
                    self.language_code,
                    self.model.model_id(),
                    self.voice
                ),
                model_name: None,
            }
        } else {
            VoiceSelection {
                language_code: self.language_code.clone(),
                name: self.voice.clone(),
                model_name: Some(self.model.model_id().to_string()),
            }
        }
    }

    fn wire_request(&self) -> SynthesizeRequest {
        // HD voices honor ssml and markup; prompted models take the
        // raw text verbatim and steer with the style prompt instead.
        let input = if self.model.is_hd_family() {
            SynthesisInput::classify(&self.text)
        } else {
            SynthesisInput::Text(self.text.clone())
        };
        SynthesizeRequest {
            input,
            voice: self.voice_selection(),
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16".to_string(),
                sample_rate_hertz: self.sample_rate_hz,
                speaking_rate: self.speaking_rate,
                volume_gain_db: self.volume_gain_db,
            },
            prompt: self.prompt.clone(),
        }
    }
}

/// Synthesize speech and parse the WAV payload into an artifact.
pub async fn synthesize_speech(
    service: &dyn SpeechService,
    policy: &RetryPolicy,
    request: &SpeechRequest,
) -> Result<AudioArtifact> {
    request.validate()?;
    let wire = request.wire_request();
    let model_id = request.model.model_id();

    tracing::info!(model = model_id, voice = %wire.voice.name, "synthesizing speech");
    let wav_bytes = retry::invoke(policy, model_id, || service.synthesize(&wire)).await?;
    wav_to_audio(&wav_bytes)
}
