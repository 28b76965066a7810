use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use flowfusion_core::config::AppConfig;
use flowfusion_engine::{RunWorkflowRequest, WorkflowExecutor};
use flowfusion_test_utils::RecordingGenerator;

const EDITOR_PAYLOAD: &str = r#"{
    "workflow": {
        "nodes": [
            {"id": "1", "type": "customInput", "position": {"x": 0, "y": 0}, "data": {"label": "User Query"}},
            {"id": "2", "type": "knowledgeBase", "data": {"label": "Knowledge Base"}},
            {"id": "3", "type": "llm", "data": {"label": "LLM (OpenAI)"}}
        ],
        "edges": [
            {"id": "e1-2", "source": "1", "target": "2"},
            {"id": "e2-3", "source": "2", "target": "3"}
        ]
    },
    "query": "What is the first rule of Fight Club?"
}"#;

#[tokio::test]
async fn test_default_corpus_feeds_generation() {
    let config = AppConfig::default();
    let kb = flowfusion_memory::load_knowledge_base(&config)
        .await
        .expect("load knowledge base");
    let generator = Arc::new(RecordingGenerator::new("You do not talk about Fight Club."));
    let executor = WorkflowExecutor::new(Arc::new(kb), generator.clone(), &config.engine);

    let request: RunWorkflowRequest = serde_json::from_str(EDITOR_PAYLOAD).expect("parse payload");
    let outcome = executor
        .execute(&request.workflow, &request.query, &CancellationToken::new())
        .await
        .expect("execute workflow");

    assert_eq!(outcome.response(), "You do not talk about Fight Club.");
    assert_eq!(outcome.path(), ["User Query", "Knowledge Base", "LLM (OpenAI)"]);

    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    let prompt = &calls[0].1;
    assert!(prompt.contains("Context from Knowledge Base:\n- The first rule of Fight Club"));
    assert_eq!(prompt.matches("\n- ").count(), 2);
    assert!(prompt.ends_with("User Query: What is the first rule of Fight Club?"));
}

#[tokio::test]
async fn test_unconfigured_generator_from_config() {
    let mut config = AppConfig::default();
    config.model.api_key = None;
    std::env::remove_var("OPENAI_API_KEY");

    let kb = flowfusion_memory::load_knowledge_base(&config)
        .await
        .expect("load knowledge base");
    let generator = flowfusion_llm::create_generator(&config.model);
    let executor = WorkflowExecutor::new(Arc::new(kb), generator, &config.engine);

    let request: RunWorkflowRequest = serde_json::from_str(EDITOR_PAYLOAD).expect("parse payload");
    let outcome = executor
        .execute(&request.workflow, &request.query, &CancellationToken::new())
        .await
        .expect("execute workflow");

    assert!(!outcome.is_answered());
    assert!(outcome
        .response()
        .starts_with("Generation service is not configured."));
}
