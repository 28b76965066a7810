//! Workflow execution engine.
//!
//! Walks a submitted workflow from its entry node, applies each node's
//! behavior, accumulates retrieved context, and hands the assembled prompt
//! to the generation collaborator once a generation node is reached.

mod call;
pub mod context;
pub mod dispatch;
pub mod executor;
pub mod graph;
pub mod outcome;
pub mod prompt;
pub mod request;

pub use context::ExecutionContext;
pub use dispatch::{Dispatch, NodeDispatcher};
pub use executor::{Traversal, WorkflowExecutor};
pub use graph::{find_entry, Graph, NodeKind, WorkflowEdge, WorkflowNode};
pub use outcome::ExecutionOutcome;
pub use request::{RunWorkflowRequest, Workflow};
