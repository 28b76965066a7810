use serde::{Deserialize, Serialize};

use crate::graph::{WorkflowEdge, WorkflowNode};

/// A workflow as submitted by the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflow {
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
}

impl Workflow {
    pub fn new(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) -> Self {
        Self { nodes, edges }
    }
}

/// Body of a run request: the workflow plus the user's question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunWorkflowRequest {
    pub workflow: Workflow,
    pub query: String,
}
