use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use flowfusion_core::config::GatewayConfig;
use flowfusion_engine::WorkflowExecutor;

use crate::routes;
use crate::state::AppState;

/// Build the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/api/health", get(routes::health))
        .route("/run-workflow", post(routes::run_workflow))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP gateway server built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    executor: Arc<WorkflowExecutor>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, executor: Arc<WorkflowExecutor>) -> Self {
        Self { config, executor }
    }

    /// Run the gateway server until the cancellation token is triggered.
    ///
    /// In-flight executions observe the same token and abort on shutdown.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState {
            executor: self.executor.clone(),
            shutdown: shutdown.clone(),
        });
        let app = router(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use flowfusion_core::config::EngineConfig;
    use flowfusion_core::traits::Generator;
    use flowfusion_test_utils::{
        FailingGenerator, NotConfiguredGenerator, RecordingGenerator, StaticRetriever,
    };

    const FIGHT_CLUB: &str = r#"{
        "workflow": {
            "nodes": [
                {"id": "1", "type": "customInput", "data": {"label": "User Query"}},
                {"id": "2", "type": "knowledgeBase", "data": {"label": "Knowledge Base"}},
                {"id": "3", "type": "llm", "data": {"label": "LLM (OpenAI)"}}
            ],
            "edges": [
                {"id": "e1-2", "source": "1", "target": "2"},
                {"id": "e2-3", "source": "2", "target": "3"}
            ]
        },
        "query": "What is Fight Club's first rule?"
    }"#;

    fn app(generator: Arc<dyn Generator>) -> (Router, CancellationToken) {
        let executor = WorkflowExecutor::new(
            Arc::new(StaticRetriever::new([
                "The first rule of Fight Club is: you do not talk about Fight Club.",
            ])),
            generator,
            &EngineConfig::default(),
        );
        let shutdown = CancellationToken::new();
        let state = Arc::new(AppState {
            executor: Arc::new(executor),
            shutdown: shutdown.clone(),
        });
        (router(state), shutdown)
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/run-workflow")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_run_workflow_answers() {
        let generator = Arc::new(RecordingGenerator::new("You do not talk about Fight Club."));
        let (app, _) = app(generator.clone());

        let (status, json) = post_json(app, FIGHT_CLUB).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"response": "You do not talk about Fight Club."}));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_entry_is_bad_request() {
        let (app, _) = app(Arc::new(RecordingGenerator::new("ok")));
        let body = r#"{"workflow": {"nodes": [{"id": "3", "type": "llm"}], "edges": []}, "query": "q"}"#;

        let (status, json) = post_json(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "Workflow must have a User Query component.");
    }

    #[tokio::test]
    async fn test_missing_generation_is_bad_request() {
        let (app, _) = app(Arc::new(RecordingGenerator::new("ok")));
        let body = r#"{"workflow": {"nodes": [{"id": "1", "type": "customInput"}], "edges": []}, "query": "q"}"#;

        let (status, json) = post_json(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["detail"], "No LLM component found in the workflow.");
    }

    #[tokio::test]
    async fn test_generation_failure_is_server_error() {
        let (app, _) = app(Arc::new(FailingGenerator::new("HTTP 401: invalid api key")));

        let (status, json) = post_json(app, FIGHT_CLUB).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = json["detail"].as_str().unwrap();
        assert!(detail.starts_with("An error occurred with the generation service:"));
        assert!(detail.contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_unconfigured_returns_advisory() {
        let (app, _) = app(Arc::new(NotConfiguredGenerator::default()));

        let (status, json) = post_json(app, FIGHT_CLUB).await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["response"]
            .as_str()
            .unwrap()
            .starts_with("Generation service is not configured."));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_runs() {
        let (app, shutdown) = app(Arc::new(RecordingGenerator::new("ok")));
        shutdown.cancel();

        let (status, _) = post_json(app, FIGHT_CLUB).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (app, _) = app(Arc::new(RecordingGenerator::new("ok")));

        let (status, json) = post_json(app, r#"{"query": "missing workflow"}"#).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(json["detail"].is_string());
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let (app, _) = app(Arc::new(NotConfiguredGenerator::default()));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["message"], "FlowFusion backend is running.");

        let response = app
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["generation_configured"], false);
    }
}
