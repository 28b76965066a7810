use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use flowfusion_engine::WorkflowExecutor;

/// Shared application state for axum handlers.
pub struct AppState {
    pub executor: Arc<WorkflowExecutor>,
    /// Cancelled on server shutdown; each run gets a child token.
    pub shutdown: CancellationToken,
}
