use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    // Workflow errors
    #[error("Workflow must have a User Query component.")]
    MissingEntryNode,

    #[error("No LLM component found in the workflow.")]
    MissingGenerationNode,

    #[error("Workflow contains a cycle through node '{node}'")]
    CycleDetected { node: String },

    // Retrieval errors
    #[error("Knowledge base query failed: {0}")]
    Retrieval(String),

    #[error("Embedding request failed: {0}")]
    Embedding(String),

    // Generation errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    #[error("An error occurred with the generation service: {0}")]
    GenerationService(String),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("Workflow execution cancelled")]
    Cancelled,

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // Storage errors
    #[error("Database error: {0}")]
    Database(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// Whether the failure was caused by the submitted workflow rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FlowError::MissingEntryNode
                | FlowError::MissingGenerationNode
                | FlowError::CycleDetected { .. }
        )
    }

    /// Whether a collaborator call that failed this way is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::LlmRequest(msg) | FlowError::Embedding(msg) | FlowError::Retrieval(msg) => {
                msg.contains("429")
                    || msg.contains("500")
                    || msg.contains("502")
                    || msg.contains("503")
                    || msg.contains("timeout")
                    || msg.contains("connection")
            }
            FlowError::Timeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
