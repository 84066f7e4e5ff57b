//! End-to-end tests for the unified `/api` endpoint.
//!
//! Drives the axum router directly with `tower::ServiceExt::oneshot` and the
//! dummy provider — no sockets, no network, no API keys.

use std::path::Path;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use notetutor::llm::LlmProvider;
use notetutor::llm::providers::dummy::DummyProvider;
use notetutor::server::{AppState, build_router};
use notetutor::study::StudyService;

fn router_with(provider: DummyProvider) -> Router {
    let prompts = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/prompts");
    let service = StudyService::new(
        LlmProvider::Dummy(provider),
        prompts,
        2048,
        500,
        Duration::from_secs(0),
    );
    build_router(AppState::new(service, 2000))
}

async fn post_api(router: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let router = router_with(DummyProvider::echo());
    let request = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["started_at"].is_string());
}

#[tokio::test]
async fn get_summary_returns_reply() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "getSummary", "notesContent": "the mitochondria is the powerhouse" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Echo replies with the last user turn — the summary task prompt.
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.starts_with("[echo] Can you generate a summary"));
}

#[tokio::test]
async fn get_summary_rejects_empty_notes() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "getSummary", "notesContent": "" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("notesContent"));
}

#[tokio::test]
async fn missing_action_is_bad_request() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(router, json!({ "notesContent": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("action"));
}

#[tokio::test]
async fn unknown_action_is_bad_request() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(router, json!({ "action": "frobnicate" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_json_body_gets_json_error() {
    let router = router_with(DummyProvider::echo());
    let request = Request::builder()
        .method("POST")
        .uri("/api")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not valid json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    // The malformed-body rejection uses the same { "error": .. } shape as
    // every other failure.
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid JSON body"));
}

#[tokio::test]
async fn throttled_provider_recovers_after_one_retry() {
    let router = router_with(DummyProvider::throttled(1, "A summary at last."));
    let (status, body) = post_api(
        router,
        json!({ "action": "getSummary", "notesContent": "notes" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "A summary at last.");
}

#[tokio::test]
async fn persistent_throttle_surfaces_as_429() {
    let router = router_with(DummyProvider::throttled(2, "never reached"));
    let (status, body) = post_api(
        router,
        json!({ "action": "getSummary", "notesContent": "notes" }),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body["error"],
        "The model provider is rate-limiting requests. Please wait 30 seconds and try again."
    );
}

#[tokio::test]
async fn get_questions_substitutes_count() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "getQuestions", "notesContent": "notes", "numQuestions": 4 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"].as_str().unwrap().contains("4 exam style questions"));
}

#[tokio::test]
async fn get_questions_rejects_zero_count() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "getQuestions", "notesContent": "notes", "numQuestions": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("numQuestions"));
}

#[tokio::test]
async fn get_flashcards_substitutes_count() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "getFlashCards", "notesContent": "notes", "numCards": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["reply"].as_str().unwrap().contains("10 flash cards"));
}

#[tokio::test]
async fn check_answer_includes_question_and_answer() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({
            "action": "checkAnswer",
            "notesContent": "notes",
            "question": "What is entropy?",
            "answer": "I don't know"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("What is entropy?"));
    assert!(reply.contains("My answer is: I don't know"));
}

#[tokio::test]
async fn get_keywords_splits_reply_lines() {
    let router = router_with(DummyProvider::canned("thermodynamics\nentropy\nheat engines"));
    let (status, body) = post_api(
        router,
        json!({ "action": "getKeywords", "prompt": "physics revision" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["keywords"],
        json!(["thermodynamics", "entropy", "heat engines"])
    );
}

#[tokio::test]
async fn search_matches_index_entries() {
    let yaml = "\
notes/thermo.md:
  one_sentence: Covers thermodynamics and entropy.
notes/bio.md:
  one_sentence: Photosynthesis notes.
";
    let router = router_with(DummyProvider::canned("thermodynamics"));
    let (status, body) = post_api(
        router,
        json!({ "action": "search", "prompt": "heat stuff", "yamlContent": yaml }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"], json!(["notes/thermo.md"]));
}

#[tokio::test]
async fn search_rejects_non_mapping_yaml() {
    let router = router_with(DummyProvider::canned("anything"));
    let (status, body) = post_api(
        router,
        json!({ "action": "search", "prompt": "x", "yamlContent": "- just\n- a list\n" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("mapping"));
}

#[tokio::test]
async fn extract_text_reads_txt_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "cells divide by mitosis").unwrap();

    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "extractText", "filePath": path.to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "cells divide by mitosis");
}

#[tokio::test]
async fn extract_text_rejects_zero_max_chars() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "some notes").unwrap();

    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "extractText", "filePath": path.to_str().unwrap(), "maxChars": 0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("maxChars"));
}

#[tokio::test]
async fn extract_text_missing_file_is_not_found() {
    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "extractText", "filePath": "/nonexistent/notes.txt" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn extract_text_unsupported_type_is_bad_request() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("notes.epub");
    std::fs::write(&path, "x").unwrap();

    let router = router_with(DummyProvider::echo());
    let (status, body) = post_api(
        router,
        json!({ "action": "extractText", "filePath": path.to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains(".epub"));
}
