//! Workflow graph: the per-request view of a submitted workflow.
//!
//! A workflow is a list of typed `WorkflowNode`s joined by `WorkflowEdge`s.
//! `Graph::build` keeps one successor per source node, so the walk from the
//! entry node is always a single chain. Node behavior is selected by
//! `NodeKind`, derived from the node's `type` tag.

pub mod edge;
pub mod model;
pub mod node;

pub use edge::WorkflowEdge;
pub use model::{find_entry, Graph};
pub use node::{NodeKind, WorkflowNode};
