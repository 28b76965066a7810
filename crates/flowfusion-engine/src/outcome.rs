use serde::Serialize;

/// Successful result of executing a workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// The generation service answered.
    Answered { response: String, path: Vec<String> },
    /// No credential is provisioned; the call was skipped and an advisory returned.
    GenerationUnconfigured { advisory: String, path: Vec<String> },
}

impl ExecutionOutcome {
    /// Text returned to the caller.
    pub fn response(&self) -> &str {
        match self {
            ExecutionOutcome::Answered { response, .. } => response,
            ExecutionOutcome::GenerationUnconfigured { advisory, .. } => advisory,
        }
    }

    /// Labels of the nodes visited, entry first.
    pub fn path(&self) -> &[String] {
        match self {
            ExecutionOutcome::Answered { path, .. }
            | ExecutionOutcome::GenerationUnconfigured { path, .. } => path,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, ExecutionOutcome::Answered { .. })
    }
}
