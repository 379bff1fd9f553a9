//! Music generation node.

use crate::node::{MediaNode, NodeHost, NodeInputs, NodeResult, NodeValue};
use crate::nodes::imagen::seed_from;
use crate::schema::{InputSpec, NodeSchema, SemanticType};
use async_trait::async_trait;
use genmedia_core::generate::{generate_music, MusicRequest};
use serde_json::json;
use uuid::Uuid;

/// Text-to-music node.
pub struct LyriaNode;

const NODE_NAME: &str = "lyria_generate";

#[async_trait]
impl MediaNode for LyriaNode {
    fn schema(&self) -> NodeSchema {
        NodeSchema {
            name: NODE_NAME.into(),
            category: "GenMedia/Audio".into(),
            inputs: vec![
                InputSpec::required("prompt", SemanticType::Text),
                InputSpec::optional("negative_prompt", SemanticType::Text, json!("")),
                InputSpec::optional("count", SemanticType::Integer, json!(1)),
                InputSpec::optional("seed", SemanticType::Integer, json!(0))
                    .describe("non-zero forces a single clip"),
            ],
            outputs: vec![SemanticType::AudioArtifact],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = NODE_NAME, %invocation, "executing");

        let request = MusicRequest {
            prompt: inputs.text("prompt")?.to_string(),
            negative_prompt: inputs.text_opt("negative_prompt")?.map(str::to_string),
            count: inputs.integer_or("count", 1)?.max(0) as u32,
            seed: seed_from(inputs.integer_or("seed", 0)?)?,
        };

        let artifacts = generate_music(host.prediction.as_ref(), &host.policy, &request).await?;
        Ok(artifacts.into_iter().map(NodeValue::Audio).collect())
    }
}
