//! Registry mapping node type names to implementations.

use crate::node::MediaNode;
use crate::schema::NodeSchema;
use std::collections::HashMap;
use std::sync::Arc;

/// Node registry the host enumerates and dispatches against.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn MediaNode>>,
}

impl NodeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in generation nodes.
    pub fn with_builtin_nodes() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(crate::nodes::ImagenNode));
        registry.register(Arc::new(crate::nodes::VeoTextNode));
        registry.register(Arc::new(crate::nodes::VeoImageNode));
        registry.register(Arc::new(crate::nodes::VeoReferencesNode));
        registry.register(Arc::new(crate::nodes::TryOnNode));
        registry.register(Arc::new(crate::nodes::TtsNode));
        registry.register(Arc::new(crate::nodes::LyriaNode));
        registry
    }

    /// Register a node under its schema name, replacing any previous
    /// registration for that name.
    pub fn register(&mut self, node: Arc<dyn MediaNode>) {
        let name = node.schema().name;
        tracing::debug!(node = %name, "registered node");
        self.nodes.insert(name, node);
    }

    /// Look up a node by type name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn MediaNode>> {
        self.nodes.get(name).cloned()
    }

    /// Schemas of every registered node, sorted by name.
    pub fn schemas(&self) -> Vec<NodeSchema> {
        let mut schemas: Vec<NodeSchema> = self.nodes.values().map(|n| n.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }
}
