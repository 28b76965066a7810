use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use flowfusion_core::config::EngineConfig;
use flowfusion_core::error::{FlowError, Result};
use flowfusion_core::traits::Retriever;

use crate::call::{backoff_delay, bounded, pause};
use crate::context::ExecutionContext;
use crate::graph::{NodeKind, WorkflowNode};

/// What the traversal should do after a node has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    /// The node is the generation step; stop walking.
    Generate,
}

/// Applies each visited node's side effect to the execution context.
pub struct NodeDispatcher {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    timeout: Duration,
    retries: u32,
    backoff_ms: u64,
}

impl NodeDispatcher {
    pub fn new(retriever: Arc<dyn Retriever>, config: &EngineConfig) -> Self {
        Self {
            retriever,
            top_k: config.retrieval_top_k,
            timeout: Duration::from_secs(config.retrieval_timeout_secs),
            retries: config.retrieval_retries,
            backoff_ms: config.retrieval_backoff_ms,
        }
    }

    /// Run the node's behavior.
    ///
    /// Retrieval failures are absorbed into a fallback note; only cancellation
    /// is returned as an error.
    pub async fn dispatch(
        &self,
        node: &WorkflowNode,
        ctx: &mut ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Dispatch> {
        match node.kind() {
            NodeKind::Entry => Ok(Dispatch::Continue),
            NodeKind::Retrieval => {
                let result = self.retrieve(ctx.query(), cancel).await;
                match result {
                    Ok(passages) => {
                        debug!(node_id = %node.id, passages = passages.len(), "Retrieved context");
                        ctx.append_passages(&passages);
                    }
                    Err(FlowError::Cancelled) => return Err(FlowError::Cancelled),
                    Err(e) => {
                        warn!(node_id = %node.id, error = %e, "Knowledge base query failed, continuing without context");
                        ctx.append_fallback();
                    }
                }
                Ok(Dispatch::Continue)
            }
            NodeKind::Generation => Ok(Dispatch::Generate),
            NodeKind::Passthrough => {
                debug!(node_id = %node.id, node_type = %node.node_type, "Passing through node");
                Ok(Dispatch::Continue)
            }
        }
    }

    async fn retrieve(&self, query: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let mut attempt = 0;
        loop {
            let result = bounded(
                "retrieval",
                self.timeout,
                cancel,
                self.retriever.query(query, self.top_k),
            )
            .await;

            match result {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    let backoff = backoff_delay(attempt, self.backoff_ms);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying knowledge base query"
                    );
                    pause(backoff, cancel).await?;
                }
                other => return other,
            }
        }
    }
}
