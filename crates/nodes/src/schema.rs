//! Node input/output schemas.
//!
//! The host discovers what a node accepts and returns from its
//! declared schema; semantic types are a closed set shared by every
//! node family.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semantic type of a node input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SemanticType {
    /// Free-form text
    Text,
    /// Integer with optional bounds
    Integer,
    /// Float with optional bounds
    Float,
    /// Boolean flag
    Boolean,
    /// One of a fixed set of string choices
    Enum(Vec<String>),
    /// Pixel tensor `(batch, height, width, channels)`
    ImageTensor,
    /// Audio waveform with sample rate
    AudioArtifact,
    /// Object-store URI
    BlobUri,
    /// List of local filesystem paths
    FilePaths,
    /// Model tier identifier
    ModelIdentifier,
}

/// One declared node input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    /// Input name as the host passes it
    pub name: String,
    /// Semantic type of the value
    pub semantic_type: SemanticType,
    /// Whether the host must supply the input
    pub required: bool,
    /// Default used when the input is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Short human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InputSpec {
    /// A required input with no default.
    pub fn required(name: &str, semantic_type: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            required: true,
            default: None,
            description: None,
        }
    }

    /// An optional input with a default value.
    pub fn optional(name: &str, semantic_type: SemanticType, default: Value) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            required: false,
            default: Some(default),
            description: None,
        }
    }

    /// Attach a description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Declared contract of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSchema {
    /// Node type name, unique within a registry
    pub name: String,
    /// Free-form grouping string used by the host UI
    pub category: String,
    /// Inputs in declaration order
    pub inputs: Vec<InputSpec>,
    /// Output tuple in positional order
    pub outputs: Vec<SemanticType>,
}

impl NodeSchema {
    /// Look up an input spec by name.
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }
}
