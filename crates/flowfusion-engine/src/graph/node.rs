use serde::{Deserialize, Serialize};

/// Type tag of the node that carries the user's query.
pub const ENTRY_TYPE: &str = "customInput";
/// Type tag of a knowledge base lookup.
pub const RETRIEVAL_TYPE: &str = "knowledgeBase";
/// Type tag of the terminal completion step.
pub const GENERATION_TYPE: &str = "llm";

const ENTRY_LABEL: &str = "User Query";
const UNKNOWN_LABEL: &str = "Unknown Step";

/// Behavior selected by a node's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Entry,
    Retrieval,
    Generation,
    /// Any unrecognized type. Recorded in the path, otherwise inert.
    Passthrough,
}

impl NodeKind {
    pub fn classify(node_type: &str) -> Self {
        match node_type {
            ENTRY_TYPE => NodeKind::Entry,
            RETRIEVAL_TYPE => NodeKind::Retrieval,
            GENERATION_TYPE => NodeKind::Generation,
            _ => NodeKind::Passthrough,
        }
    }
}

/// A node as submitted by the workflow editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Free-form editor data. Only `label` is read.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            data: serde_json::Map::new(),
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.data
            .insert("label".to_string(), serde_json::Value::String(label.into()));
        self
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::classify(&self.node_type)
    }

    /// Display label used in the execution path.
    pub fn label(&self) -> &str {
        match self.data.get("label").and_then(|v| v.as_str()) {
            Some(label) => label,
            None if self.kind() == NodeKind::Entry => ENTRY_LABEL,
            None => UNKNOWN_LABEL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(NodeKind::classify("customInput"), NodeKind::Entry);
        assert_eq!(NodeKind::classify("knowledgeBase"), NodeKind::Retrieval);
        assert_eq!(NodeKind::classify("llm"), NodeKind::Generation);
        assert_eq!(NodeKind::classify("output"), NodeKind::Passthrough);
        assert_eq!(NodeKind::classify("LLM"), NodeKind::Passthrough);
    }

    #[test]
    fn test_label_defaults() {
        assert_eq!(WorkflowNode::new("1", ENTRY_TYPE).label(), "User Query");
        assert_eq!(WorkflowNode::new("2", RETRIEVAL_TYPE).label(), "Unknown Step");
        assert_eq!(
            WorkflowNode::new("3", GENERATION_TYPE).with_label("GPT").label(),
            "GPT"
        );
    }

    #[test]
    fn test_non_string_label_ignored() {
        let json = r#"{"id": "2", "type": "note", "data": {"label": 7}}"#;
        let node: WorkflowNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.label(), "Unknown Step");
    }

    #[test]
    fn test_deserialize_editor_node() {
        let json = r#"{"id": "1", "type": "customInput", "data": {"label": "Ask", "position": {"x": 10}}}"#;
        let node: WorkflowNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind(), NodeKind::Entry);
        assert_eq!(node.label(), "Ask");
    }
}
