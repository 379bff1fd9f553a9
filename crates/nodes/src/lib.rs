//! Plugin-node surface for the generative-media orchestrator.
//!
//! Nodes wrap the orchestration core behind a host-facing contract:
//! each node declares a schema of named, semantically typed inputs and
//! a positional output tuple, and implements one `execute` call. Core
//! failures are re-raised as a single runtime error whose message
//! keeps the taxonomy label as a prefix.
//!
//! [`NodeRegistry::with_builtin_nodes`] exposes the built-in image,
//! video, speech, and music nodes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod node;
pub mod nodes;
pub mod registry;
pub mod schema;

pub use node::{
    LroPhase, LroProgress, MediaNode, NodeError, NodeHost, NodeInputs, NodeResult, NodeValue,
};
pub use registry::NodeRegistry;
pub use schema::{InputSpec, NodeSchema, SemanticType};
