//! Name-to-node lookup for the built-in nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use pipeline::{ServiceError, TemplateCache, TextGenerator};

use crate::chat::ChatNode;
use crate::clean::CleanInvoiceNode;
use crate::explain::ExplainNode;
use crate::node::Node;

/// Invoice cleanup node.
pub const CLEAN_NODE: &str = "clean_yaml";
/// Data explanation node.
pub const EXPLAIN_NODE: &str = "explain";
/// Free-form chat node.
pub const CHAT_NODE: &str = "chat";

/// Names of the nodes every registry carries, sorted.
pub const BUILT_IN_NODES: [&str; 3] = [CHAT_NODE, CLEAN_NODE, EXPLAIN_NODE];

/// Fixed name → node mapping, built once at startup.
///
/// Nodes share the template cache and generator handed to [`NodeRegistry::new`].
pub struct NodeRegistry {
    nodes: BTreeMap<&'static str, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new(templates: Arc<TemplateCache>, generator: Arc<dyn TextGenerator>) -> Self {
        let nodes: Vec<Arc<dyn Node>> = vec![
            Arc::new(CleanInvoiceNode::new(templates.clone(), generator.clone())),
            Arc::new(ExplainNode::new(templates, generator.clone())),
            Arc::new(ChatNode::new(generator)),
        ];
        Self::from_nodes(nodes)
    }

    pub(crate) fn from_nodes(nodes: Vec<Arc<dyn Node>>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|node| (node.name(), node)).collect(),
        }
    }

    /// Looks up a node by exact name.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Node>, ServiceError> {
        self.nodes
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::NodeNotFound {
                name: name.to_owned(),
            })
    }

    /// Registered node names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.nodes.keys().copied().collect()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("nodes", &self.names())
            .finish()
    }
}
