use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use flowfusion_core::config::EngineConfig;
use flowfusion_core::error::{FlowError, Result};
use flowfusion_core::traits::{Generator, Retriever};

use crate::call::bounded;
use crate::context::ExecutionContext;
use crate::dispatch::{Dispatch, NodeDispatcher};
use crate::graph::{find_entry, Graph, WorkflowNode};
use crate::outcome::ExecutionOutcome;
use crate::prompt::{assemble_prompt, SYSTEM_INSTRUCTION, UNCONFIGURED_ADVISORY};
use crate::request::Workflow;

/// Where a walk stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Traversal {
    /// Reached a generation node.
    AtGeneration { node_id: String },
    /// Ran out of edges, or the next edge pointed at an unknown node.
    Dangling { last_node_id: String },
}

/// Executes submitted workflows against the retrieval and generation collaborators.
///
/// Holds no per-request state; one executor serves any number of concurrent runs.
pub struct WorkflowExecutor {
    dispatcher: NodeDispatcher,
    generator: Arc<dyn Generator>,
    system_prompt: String,
    generation_timeout: Duration,
}

impl WorkflowExecutor {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            dispatcher: NodeDispatcher::new(retriever, config),
            generator,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| SYSTEM_INSTRUCTION.to_string()),
            generation_timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }

    pub fn generation_configured(&self) -> bool {
        self.generator.is_configured()
    }

    /// Run `workflow` for `query`, producing one answer or one error.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("workflow_run", %run_id);
        self.execute_inner(workflow, query, cancel)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        workflow: &Workflow,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let start = Instant::now();
        info!(
            nodes = workflow.nodes.len(),
            edges = workflow.edges.len(),
            "Executing workflow"
        );

        let entry = find_entry(&workflow.nodes).ok_or(FlowError::MissingEntryNode)?;
        let graph = Graph::build(&workflow.nodes, &workflow.edges);

        let mut ctx = ExecutionContext::new(query);
        ctx.record_step(entry.label());

        let generation_node = match self.traverse(&graph, entry, &mut ctx, cancel).await? {
            Traversal::AtGeneration { node_id } => node_id,
            Traversal::Dangling { last_node_id } => {
                debug!(last_node_id = %last_node_id, "Walk ended before a generation node");
                return Err(FlowError::MissingGenerationNode);
            }
        };

        if !self.generator.is_configured() {
            info!(node_id = %generation_node, "Generation not configured, returning advisory");
            return Ok(ExecutionOutcome::GenerationUnconfigured {
                advisory: UNCONFIGURED_ADVISORY.to_string(),
                path: ctx.into_path(),
            });
        }

        let prompt = assemble_prompt(ctx.accumulated(), ctx.query());
        let response = bounded(
            "generation",
            self.generation_timeout,
            cancel,
            self.generator.complete(&self.system_prompt, &prompt),
        )
        .await
        .map_err(|e| match e {
            FlowError::Cancelled => FlowError::Cancelled,
            other => {
                error!(node_id = %generation_node, error = %other, "Generation call failed");
                FlowError::GenerationService(other.to_string())
            }
        })?;

        info!(
            node_id = %generation_node,
            steps = ctx.path().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Workflow complete"
        );

        Ok(ExecutionOutcome::Answered {
            response,
            path: ctx.into_path(),
        })
    }

    /// Walk successors from `entry` until a generation node or a dead end.
    ///
    /// Each node id may be visited once; revisiting one fails with `CycleDetected`.
    pub async fn traverse(
        &self,
        graph: &Graph,
        entry: &WorkflowNode,
        ctx: &mut ExecutionContext,
        cancel: &CancellationToken,
    ) -> Result<Traversal> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(graph.node_count());
        visited.insert(entry.id.as_str());
        let mut current: &str = entry.id.as_str();

        loop {
            if cancel.is_cancelled() {
                return Err(FlowError::Cancelled);
            }

            let Some(next_id) = graph.successor(current) else {
                return Ok(Traversal::Dangling {
                    last_node_id: current.to_string(),
                });
            };

            let Some(node) = graph.node(next_id) else {
                debug!(source = %current, target = %next_id, "Edge points at an unknown node");
                return Ok(Traversal::Dangling {
                    last_node_id: current.to_string(),
                });
            };

            if !visited.insert(next_id) {
                warn!(node_id = %next_id, "Workflow revisits a node, aborting");
                return Err(FlowError::CycleDetected {
                    node: next_id.to_string(),
                });
            }

            ctx.record_step(node.label());
            debug!(node_id = %node.id, node_type = %node.node_type, "Visiting node");

            match self.dispatcher.dispatch(node, ctx, cancel).await? {
                Dispatch::Generate => {
                    return Ok(Traversal::AtGeneration {
                        node_id: node.id.clone(),
                    })
                }
                Dispatch::Continue => current = next_id,
            }
        }
    }
}
