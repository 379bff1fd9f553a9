//! Speech and music paths against stubbed services.

use async_trait::async_trait;
use genmedia_core::codec::base64_wrap;
use genmedia_core::error::RemoteError;
use genmedia_core::generate::{generate_music, synthesize_speech, MusicRequest, SpeechRequest};
use genmedia_core::models::SpeechModel;
use genmedia_core::retry::RetryPolicy;
use genmedia_core::service::{PredictionService, SpeechService, SynthesisInput, SynthesizeRequest};
use genmedia_core::ErrorKind;
use serde_json::Value;
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

fn wav_bytes(sample_rate: u32, channels: u16, samples_per_channel: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..samples_per_channel * channels as usize {
            writer.write_sample(((i % 100) as i16) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Records the wire request and returns fixed WAV bytes.
struct StubSpeech {
    wav: Vec<u8>,
    last_request: Mutex<Option<SynthesizeRequest>>,
}

impl StubSpeech {
    fn new(wav: Vec<u8>) -> Self {
        Self {
            wav,
            last_request: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SpeechService for StubSpeech {
    async fn synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, RemoteError> {
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self.wav.clone())
    }
}

/// Records instances and returns fixed predictions.
struct StubPrediction {
    predictions: Vec<Value>,
    last_instances: Mutex<Option<Value>>,
}

#[async_trait]
impl PredictionService for StubPrediction {
    async fn predict(
        &self,
        _model_id: &str,
        instances: Value,
        _parameters: Value,
    ) -> Result<Vec<Value>, RemoteError> {
        *self.last_instances.lock().unwrap() = Some(instances);
        Ok(self.predictions.clone())
    }
}

fn speech_request(text: &str) -> SpeechRequest {
    SpeechRequest {
        model: SpeechModel::Chirp3Hd,
        text: text.into(),
        language_code: "en-US".into(),
        voice: "Achernar".into(),
        sample_rate_hz: None,
        speaking_rate: None,
        volume_gain_db: None,
        prompt: None,
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

#[tokio::test]
async fn ssml_text_routes_to_the_ssml_field() {
    let stub = StubSpeech::new(wav_bytes(24_000, 1, 64));
    synthesize_speech(&stub, &policy(), &speech_request("<speak>hi</speak>"))
        .await
        .unwrap();

    let sent = stub.last_request.lock().unwrap().clone().unwrap();
    assert!(matches!(sent.input, SynthesisInput::Ssml(_)));
    let wire = serde_json::to_value(&sent).unwrap();
    assert!(wire["input"].get("ssml").is_some());
    assert!(wire["input"].get("text").is_none());
}

#[tokio::test]
async fn synthesis_returns_a_decoded_artifact() -> anyhow::Result<()> {
    let stub = StubSpeech::new(wav_bytes(24_000, 2, 128));
    let artifact = synthesize_speech(&stub, &policy(), &speech_request("hello")).await?;

    assert_eq!(artifact.sample_rate_hz, 24_000);
    assert_eq!(artifact.channels(), 2);
    assert_eq!(artifact.samples(), 128);
    assert!(artifact.waveform.iter().all(|v| (-1.0..=1.0).contains(v)));

    let sent = stub.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent.voice.name, "en-US-Chirp3-HD-Achernar");
    assert_eq!(sent.audio_config.audio_encoding, "LINEAR16");
    Ok(())
}

#[tokio::test]
async fn empty_speech_text_is_rejected_locally() {
    let stub = StubSpeech::new(Vec::new());
    let err = synthesize_speech(&stub, &policy(), &speech_request("  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(stub.last_request.lock().unwrap().is_none());
}

#[tokio::test]
async fn music_seed_forces_single_sample_on_the_wire() {
    let stub = StubPrediction {
        predictions: vec![serde_json::json!({
            "audioContent": base64_wrap(&wav_bytes(48_000, 2, 256)),
        })],
        last_instances: Mutex::new(None),
    };
    let request = MusicRequest {
        prompt: "slow ambient pads".into(),
        negative_prompt: None,
        count: 4,
        seed: Some(1234),
    };

    let artifacts = generate_music(&stub, &policy(), &request).await.unwrap();

    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].sample_rate_hz, 48_000);
    let instances = stub.last_instances.lock().unwrap().clone().unwrap();
    assert_eq!(instances[0]["sample_count"], 1);
    assert_eq!(instances[0]["seed"], 1234);
}

#[tokio::test]
async fn music_decodes_every_prediction_in_order() {
    let stub = StubPrediction {
        predictions: vec![
            serde_json::json!({"audioContent": base64_wrap(&wav_bytes(48_000, 2, 100))}),
            serde_json::json!({"bytesBase64Encoded": base64_wrap(&wav_bytes(44_100, 1, 50))}),
        ],
        last_instances: Mutex::new(None),
    };
    let request = MusicRequest {
        prompt: "two takes".into(),
        negative_prompt: None,
        count: 2,
        seed: None,
    };

    let artifacts = generate_music(&stub, &policy(), &request).await.unwrap();

    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0].sample_rate_hz, 48_000);
    assert_eq!(artifacts[0].channels(), 2);
    assert_eq!(artifacts[1].sample_rate_hz, 44_100);
    assert_eq!(artifacts[1].channels(), 1);
}
