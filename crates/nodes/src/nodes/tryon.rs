//! Virtual try-on node.

use crate::node::{MediaNode, NodeError, NodeHost, NodeInputs, NodeResult, NodeValue};
use crate::nodes::imagen::{person_policy, safety_level, seed_from};
use crate::schema::{InputSpec, NodeSchema, SemanticType};
use async_trait::async_trait;
use genmedia_core::generate::{generate_try_on, TryOnRequest};
use serde_json::json;
use uuid::Uuid;

/// Person-plus-product try-on node.
pub struct TryOnNode;

const NODE_NAME: &str = "virtual_try_on";

#[async_trait]
impl MediaNode for TryOnNode {
    fn schema(&self) -> NodeSchema {
        NodeSchema {
            name: NODE_NAME.into(),
            category: "GenMedia/Image".into(),
            inputs: vec![
                InputSpec::required("person_image", SemanticType::ImageTensor),
                InputSpec::required("product_image", SemanticType::ImageTensor)
                    .describe("Batch of products; each frame is tried on separately"),
                InputSpec::optional("base_steps", SemanticType::Integer, json!(32))
                    .describe("Diffusion steps, 1-50"),
                InputSpec::optional("count", SemanticType::Integer, json!(1))
                    .describe("Images per product, 1-4"),
                InputSpec::optional("seed", SemanticType::Integer, json!(0))
                    .describe("0 leaves the seed unset"),
                InputSpec::optional("watermark", SemanticType::Boolean, json!(false)),
                InputSpec::optional(
                    "person_generation",
                    SemanticType::Enum(vec!["allow_adult".into(), "dont_allow".into()]),
                    json!("allow_adult"),
                ),
                InputSpec::optional(
                    "safety_filter_level",
                    SemanticType::Enum(vec![
                        "BLOCK_NONE".into(),
                        "BLOCK_ONLY_HIGH".into(),
                        "BLOCK_MEDIUM_AND_ABOVE".into(),
                        "BLOCK_LOW_AND_ABOVE".into(),
                    ]),
                    json!("BLOCK_MEDIUM_AND_ABOVE"),
                ),
            ],
            outputs: vec![SemanticType::ImageTensor],
        }
    }

    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>> {
        let invocation = Uuid::new_v4();
        tracing::info!(node = NODE_NAME, %invocation, "executing");

        let policy_name = inputs.text_opt("person_generation")?.unwrap_or("allow_adult");
        if policy_name == "allow_all" {
            return Err(NodeError::Runtime {
                label: "Input",
                message: "try-on only supports allow_adult or dont_allow".into(),
            });
        }
        let request = TryOnRequest {
            person: inputs.image("person_image")?.clone(),
            products: inputs.image("product_image")?.clone(),
            base_steps: inputs.integer_or("base_steps", 32)?.max(0) as u32,
            count: inputs.integer_or("count", 1)?.max(0) as u32,
            seed: seed_from(inputs.integer_or("seed", 0)?)?,
            watermark: inputs.boolean_or("watermark", false)?,
            person_policy: person_policy(policy_name)?,
            safety_level: safety_level(
                inputs
                    .text_opt("safety_filter_level")?
                    .unwrap_or("BLOCK_MEDIUM_AND_ABOVE"),
            )?,
        };

        let tensor = generate_try_on(host.prediction.as_ref(), &host.policy, &request).await?;
        Ok(vec![NodeValue::Image(tensor)])
    }
}
