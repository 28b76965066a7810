use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use flowfusion_engine::RunWorkflowRequest;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RunWorkflowResponse {
    pub response: String,
}

// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "FlowFusion backend is running." }))
}

// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "generation_configured": state.executor.generation_configured(),
    }))
}

// POST /run-workflow
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunWorkflowRequest>, JsonRejection>,
) -> Result<Json<RunWorkflowResponse>, ApiError> {
    let Json(request) = body?;
    info!(
        nodes = request.workflow.nodes.len(),
        query_len = request.query.len(),
        "Received run request"
    );

    let cancel = state.shutdown.child_token();
    let outcome = state
        .executor
        .execute(&request.workflow, &request.query, &cancel)
        .await?;

    Ok(Json(RunWorkflowResponse {
        response: outcome.response().to_string(),
    }))
}
