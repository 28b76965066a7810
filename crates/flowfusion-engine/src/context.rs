use crate::prompt::{context_block, RETRIEVAL_FALLBACK_NOTE};

/// Request-scoped state accumulated while walking a workflow.
///
/// `accumulated` is append-only: every retrieval node on the path adds its
/// own block, in traversal order, with no deduplication.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    query: String,
    accumulated: String,
    path: Vec<String>,
}

impl ExecutionContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Context text gathered so far, injected into the generation prompt.
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    /// Labels of the visited nodes, entry first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn record_step(&mut self, label: impl Into<String>) {
        self.path.push(label.into());
    }

    /// Append a knowledge base block listing `passages`.
    pub fn append_passages(&mut self, passages: &[String]) {
        self.accumulated.push_str(&context_block(passages));
    }

    /// Mark that a retrieval step degraded.
    pub fn append_fallback(&mut self) {
        self.accumulated.push_str(RETRIEVAL_FALLBACK_NOTE);
    }

    pub fn into_path(self) -> Vec<String> {
        self.path
    }
}
