// End-to-end tests for the tutoring flow
//
// Tests cover:
// - Seeded SurrealDB (in-memory engine) through the chat service
// - Live gateway against a mocked Gemini endpoint, including quota fallback
// - Chat history ordering after several turns

use std::sync::Arc;

use homegrown::config::config::{AppConfig, DatabaseBackend, DatabaseConfig, LlmConfig};
use homegrown::models::Sender;
use homegrown::services::{
    ChatService, PersonaRegistry, create_chat_service, create_enrollment_service,
    create_llm_gateway,
};
use homegrown::storage::seed::seed_demo_data;
use homegrown::storage::{Repositories, StorageFactory};
use serde_json::json;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn surreal_repositories() -> Repositories {
    let config = DatabaseConfig {
        backend: DatabaseBackend::Surrealdb,
        url: "mem://".to_string(),
        namespace: "homegrown".to_string(),
        database: "tutoring_test".to_string(),
        username: None,
        password: None,
    };
    let repos = StorageFactory::create(&config).await.unwrap();
    seed_demo_data(&repos).await.unwrap();
    repos
}

fn live_llm_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        api_key: Some("test-key".to_string()),
        base_url: server.uri(),
        offline_fallback: false,
        ..AppConfig::development().llm
    }
}

fn chat_service(repos: &Repositories, llm: &LlmConfig) -> Box<dyn ChatService> {
    create_chat_service(
        repos.catalog.clone(),
        repos.enrollments.clone(),
        repos.chat_logs.clone(),
        repos.turns.clone(),
        Arc::new(PersonaRegistry::builtin()),
        Arc::from(create_llm_gateway(llm).unwrap()),
    )
}

fn gemini_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    }))
}

#[tokio::test]
async fn test_live_completion_advances_persisted_enrollment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/v1beta/models/.+:generateContent$"))
        .respond_with(gemini_reply(
            "Great boilerplate! 🧱 On to tags. [MODULE_COMPLETE]",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let repos = surreal_repositories().await;
    let service = chat_service(&repos, &live_llm_config(&server));

    let outcome = service
        .chat(2, "<html><head></head><body></body></html>")
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Great boilerplate! 🧱 On to tags.");
    let update = outcome.workspace_update.unwrap();
    assert_eq!(update.next_module, "Tags & Elements");
    assert_eq!(update.objective, "Create a paragraph <p> and a heading <h1>.");

    let stored = repos.enrollments.get_by_id(2).await.unwrap().unwrap();
    assert_eq!(stored.current_module_index, 1);

    let history = service.history(2, 50).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, Sender::Student);
    assert_eq!(history[1].content, outcome.reply);
}

#[tokio::test]
async fn test_quota_exhaustion_falls_back_to_offline_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Quota exceeded for quota metric 'Generate Content API requests'",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let repos = surreal_repositories().await;
    let service = chat_service(&repos, &live_llm_config(&server));

    let outcome = service.chat(1, "I'm done").await.unwrap();

    assert!(outcome.reply.contains("Income"));
    assert!(!outcome.reply.contains("[MODULE_COMPLETE]"));
    assert!(outcome.workspace_update.is_none());
    assert_eq!(
        repos
            .enrollments
            .get_by_id(1)
            .await
            .unwrap()
            .unwrap()
            .current_module_index,
        0
    );
}

#[tokio::test]
async fn test_history_keeps_most_recent_entries_in_order() {
    let repos = surreal_repositories().await;
    let offline = LlmConfig {
        offline_fallback: true,
        ..AppConfig::development().llm
    };
    let service = chat_service(&repos, &offline);

    for message in ["hello", "what is a tag?", "show me a heading"] {
        service.chat(2, message).await.unwrap();
    }

    let history = service.history(2, 3).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].sender, Sender::Agent);
    assert_eq!(history[1].content, "show me a heading");
    assert_eq!(history[2].sender, Sender::Agent);
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_enrollment_summaries_from_surreal() {
    let repos = surreal_repositories().await;
    let service = create_enrollment_service(repos.enrollments.clone(), repos.catalog.clone());

    let summaries = service.list_summaries().await.unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].enrollment_id, 1);
    assert_eq!(summaries[0].course_title.as_deref(), Some("Money 101"));
    assert_eq!(summaries[1].agent_name.as_deref(), Some("Tera Byte"));
    assert_eq!(summaries[1].total_modules, Some(2));
}
