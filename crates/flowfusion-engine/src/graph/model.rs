use std::collections::HashMap;

use tracing::{debug, warn};

use super::edge::WorkflowEdge;
use super::node::{NodeKind, WorkflowNode};

/// Request-scoped graph: nodes by id plus a single successor per source.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<String, WorkflowNode>,
    successors: HashMap<String, String>,
}

impl Graph {
    /// Index the submitted nodes and edges.
    ///
    /// Duplicate node ids keep the last occurrence. When several edges share a
    /// source, the last edge wins and the others are dropped.
    pub fn build(nodes: &[WorkflowNode], edges: &[WorkflowEdge]) -> Self {
        let mut node_map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if node_map.insert(node.id.clone(), node.clone()).is_some() {
                debug!(node_id = %node.id, "Duplicate node id, keeping last occurrence");
            }
        }

        let mut successors = HashMap::with_capacity(edges.len());
        for edge in edges {
            if let Some(previous) = successors.insert(edge.source.clone(), edge.target.clone()) {
                warn!(
                    source = %edge.source,
                    dropped_target = %previous,
                    kept_target = %edge.target,
                    "Multiple edges leave one node; only the last is followed"
                );
            }
        }

        Self {
            nodes: node_map,
            successors,
        }
    }

    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.get(id)
    }

    pub fn successor(&self, id: &str) -> Option<&str> {
        self.successors.get(id).map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// The first node, in submission order, tagged as the entry.
pub fn find_entry(nodes: &[WorkflowNode]) -> Option<&WorkflowNode> {
    nodes.iter().find(|n| n.kind() == NodeKind::Entry)
}
