//! Speech synthesis node.

use crate::node::{MediaNode, NodeError, NodeHost, NodeInputs, NodeResult, NodeValue};
use crate::schema::{InputSpec, NodeSchema, SemanticType};
use async_trait::async_trait;
use genmedia_core::generate::{synthesize_speech, SpeechRequest};
use genmedia_core::models::SpeechModel;
use serde_json::json;
use uuid::Uuid;

/// Text-to-speech node.
pub struct TtsNode;

const NODE_NAME: &str = "tts_synthesize";

fn speech_model(id: &str) -> NodeResult<SpeechModel> {
    match id {
        "chirp3-hd" => Ok(SpeechModel::Chirp3Hd),
        "gemini-2.5-pro-tts" => Ok(SpeechModel::GeminiProTts),
        "gemini-2.5-flash-tts" => Ok(SpeechModel::GeminiFlashTts),
        other => Err(NodeError::Runtime {
            label: "Input",
            message: format!("unknown speech model '{other}'"),
        }),
    }
}

#[async_trait]
impl MediaNode for TtsNode {
    fn schema(&self) -> NodeSchema {
        NodeSchema {
            name: NODE_NAME.into(),
            category: "GenMedia/Audio".into(),
            inputs: vec![
                InputSpec::required("text", SemanticType::Text)
                    .describe("plain text, SSML, or bracketed markup"),
                InputSpec::optional(
                    "model",
                    SemanticType::Enum(vec![
                        "chirp3-hd".into(),
                        "gemini-2.5-pro-tts".into(),
                        "gemini-2.5-flash-tts".into(),
                    ]),
                    json!("chirp3-hd"),
                ),
                InputSpec::optional("language_code", SemanticType::Text, json!("en-US")),
                InputSpec::optional("voice", SemanticType::Text, json!("Achernar")),
                InputSpec::optional("sample_rate_hz", SemanticType::Integer, json!(0))
                    .describe("0 takes the voice default"),
                InputSpec::optional("speaking_rate", SemanticType::Float, json!(1.0)),
                InputSpec::optional("volume_gain_db", SemanticType::Float, json!(0.0)),
                InputSpec::optional("style_prompt", SemanticType::Text, json!(""))
                    .describe("prompted models only"),
            ],
            outputs: vec![SemanticType::AudioArtifact],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = NODE_NAME, %invocation, "executing");

        let sample_rate = inputs.integer_or("sample_rate_hz", 0)?;
        let request = SpeechRequest {
            model: speech_model(inputs.text_opt("model")?.unwrap_or("chirp3-hd"))?,
            text: inputs.text("text")?.to_string(),
            language_code: inputs.text_opt("language_code")?.unwrap_or("en-US").to_string(),
            voice: inputs.text_opt("voice")?.unwrap_or("Achernar").to_string(),
            sample_rate_hz: (sample_rate > 0).then_some(sample_rate as u32),
            speaking_rate: Some(inputs.float_or("speaking_rate", 1.0)?),
            volume_gain_db: Some(inputs.float_or("volume_gain_db", 0.0)?),
            prompt: inputs.text_opt("style_prompt")?.map(str::to_string),
        };

        let artifact = synthesize_speech(host.speech.as_ref(), &host.policy, &request).await?;
        Ok(vec![NodeValue::Audio(artifact)])
    }
}
