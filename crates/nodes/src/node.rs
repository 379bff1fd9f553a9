//! Node contract: values, errors, the execution trait, and the LRO
//! phase machine.

use crate::schema::NodeSchema;
use async_trait::async_trait;
use genmedia_core::codec::AudioArtifact;
use genmedia_core::retry::RetryPolicy;
use genmedia_core::service::{GenerativeService, PredictionService, SpeechService};
use genmedia_core::storage::ObjectStore;
use genmedia_core::MediaTensor;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors a node surfaces to the host.
///
/// Core errors collapse into a single `Runtime` failure whose message
/// keeps the taxonomy label as a prefix, so hosts can present one
/// line and operators can still see the class.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A core failure re-raised for the host
    #[error("[{label}] {message}")]
    Runtime {
        /// Taxonomy label of the underlying failure
        label: &'static str,
        /// Human-readable diagnostic
        message: String,
    },
}

impl NodeError {
    /// Taxonomy label carried by this error.
    pub fn label(&self) -> &'static str {
        match self {
            NodeError::Runtime { label, .. } => label,
        }
    }
}

impl From<genmedia_core::Error> for NodeError {
    fn from(err: genmedia_core::Error) -> Self {
        NodeError::Runtime {
            label: err.kind().label(),
            message: err.to_string(),
        }
    }
}

/// Node-facing result alias.
pub type NodeResult<T> = std::result::Result<T, NodeError>;

/// A value crossing the node boundary.
#[derive(Debug, Clone)]
pub enum NodeValue {
    /// Free-form text
    Text(String),
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// Boolean flag
    Boolean(bool),
    /// Pixel tensor
    Image(MediaTensor),
    /// Audio waveform
    Audio(AudioArtifact),
    /// Object-store URI or local file path
    Uri(String),
    /// Ordered list of local file paths
    Paths(Vec<PathBuf>),
}

/// Named inputs handed to `execute`.
#[derive(Debug, Clone, Default)]
pub struct NodeInputs(HashMap<String, NodeValue>);

impl NodeInputs {
    /// Empty input bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous one.
    pub fn set(&mut self, name: &str, value: NodeValue) -> &mut Self {
        self.0.insert(name.to_string(), value);
        self
    }

    fn missing(name: &str) -> NodeError {
        NodeError::Runtime {
            label: "Input",
            message: format!("missing required input '{name}'"),
        }
    }

    fn wrong_type(name: &str, expected: &str) -> NodeError {
        NodeError::Runtime {
            label: "Input",
            message: format!("input '{name}' is not {expected}"),
        }
    }

    /// Required text input.
    pub fn text(&self, name: &str) -> NodeResult<&str> {
        match self.0.get(name) {
            Some(NodeValue::Text(s)) => Ok(s),
            Some(_) => Err(Self::wrong_type(name, "text")),
            None => Err(Self::missing(name)),
        }
    }

    /// Optional text input; empty strings read as absent.
    pub fn text_opt(&self, name: &str) -> NodeResult<Option<&str>> {
        match self.0.get(name) {
            Some(NodeValue::Text(s)) => Ok(Some(s.as_str()).filter(|s| !s.trim().is_empty())),
            Some(_) => Err(Self::wrong_type(name, "text")),
            None => Ok(None),
        }
    }

    /// Integer input with a fallback default.
    pub fn integer_or(&self, name: &str, default: i64) -> NodeResult<i64> {
        match self.0.get(name) {
            Some(NodeValue::Integer(v)) => Ok(*v),
            Some(_) => Err(Self::wrong_type(name, "an integer")),
            None => Ok(default),
        }
    }

    /// Float input with a fallback default.
    pub fn float_or(&self, name: &str, default: f64) -> NodeResult<f64> {
        match self.0.get(name) {
            Some(NodeValue::Float(v)) => Ok(*v),
            Some(NodeValue::Integer(v)) => Ok(*v as f64),
            Some(_) => Err(Self::wrong_type(name, "a number")),
            None => Ok(default),
        }
    }

    /// Boolean input with a fallback default.
    pub fn boolean_or(&self, name: &str, default: bool) -> NodeResult<bool> {
        match self.0.get(name) {
            Some(NodeValue::Boolean(v)) => Ok(*v),
            Some(_) => Err(Self::wrong_type(name, "a boolean")),
            None => Ok(default),
        }
    }

    /// Required image tensor input.
    pub fn image(&self, name: &str) -> NodeResult<&MediaTensor> {
        match self.0.get(name) {
            Some(NodeValue::Image(t)) => Ok(t),
            Some(_) => Err(Self::wrong_type(name, "an image tensor")),
            None => Err(Self::missing(name)),
        }
    }

    /// Optional image tensor input.
    pub fn image_opt(&self, name: &str) -> NodeResult<Option<&MediaTensor>> {
        match self.0.get(name) {
            Some(NodeValue::Image(t)) => Ok(Some(t)),
            Some(_) => Err(Self::wrong_type(name, "an image tensor")),
            None => Ok(None),
        }
    }
}

/// Services and settings the host provides to every node invocation.
pub struct NodeHost {
    /// Generative surface (images, video)
    pub generative: Arc<dyn GenerativeService>,
    /// Prediction surface (music, try-on)
    pub prediction: Arc<dyn PredictionService>,
    /// Speech surface
    pub speech: Arc<dyn SpeechService>,
    /// Object store
    pub store: Arc<dyn ObjectStore>,
    /// Retry policy applied to remote calls
    pub policy: RetryPolicy,
    /// LRO poll interval
    pub poll_interval: Duration,
    /// Host-owned directory for saved artifacts
    pub temp_dir: PathBuf,
}

/// An executable generative-media node.
#[async_trait]
pub trait MediaNode: Send + Sync {
    /// The node's declared contract.
    fn schema(&self) -> NodeSchema;

    /// Run the node against the host-provided inputs.
    async fn execute(&self, host: &NodeHost, inputs: &NodeInputs) -> NodeResult<Vec<NodeValue>>;
}

pub use genmedia_core::generate::{LroPhase, LroProgress};
