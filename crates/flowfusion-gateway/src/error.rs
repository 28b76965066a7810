use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::warn;

use flowfusion_core::error::FlowError;

/// Error returned by gateway handlers, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    /// Execution failed.
    Workflow(FlowError),
    /// The body was not a well-formed run request.
    InvalidBody(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Workflow(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Workflow(FlowError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Workflow(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            ApiError::Workflow(e) => e.to_string(),
            ApiError::InvalidBody(msg) => msg.clone(),
        }
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        ApiError::Workflow(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = %status, detail = %self.detail(), "Request failed");
        }
        (status, Json(serde_json::json!({ "detail": self.detail() }))).into_response()
    }
}
