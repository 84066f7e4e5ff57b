//! Handlers for the unified `/api` endpoint.
//!
//! The request body is JSON tagged by `action`; field names are camelCase
//! to match the original frontend contract. Responses are `{ "reply": .. }`,
//! `{ "keywords": [..] }`, `{ "results": [..] }` or `{ "content": .. }` on
//! success and `{ "error": message }` otherwise.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::config::expand_home;
use crate::extract::{self, ExtractError};
use crate::llm::ProviderError;
use crate::search::{self, SearchError};
use crate::study::StudyError;

use super::AppState;

const THROTTLE_MESSAGE: &str =
    "The model provider is rate-limiting requests. Please wait 30 seconds and try again.";

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(tag = "action")]
pub(super) enum ApiRequest {
    #[serde(rename = "getSummary", rename_all = "camelCase")]
    GetSummary { notes_content: String },
    #[serde(rename = "getQuestions", rename_all = "camelCase")]
    GetQuestions {
        notes_content: String,
        num_questions: u32,
    },
    #[serde(rename = "getFlashCards", rename_all = "camelCase")]
    GetFlashCards {
        notes_content: String,
        num_cards: u32,
    },
    #[serde(rename = "checkAnswer", rename_all = "camelCase")]
    CheckAnswer {
        notes_content: String,
        question: String,
        answer: String,
    },
    #[serde(rename = "getKeywords")]
    GetKeywords { prompt: String },
    #[serde(rename = "search", rename_all = "camelCase")]
    Search {
        prompt: String,
        yaml_content: String,
    },
    #[serde(rename = "extractText", rename_all = "camelCase")]
    ExtractText {
        file_path: String,
        max_chars: Option<usize>,
    },
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response matching the frontend contract.
fn json_error(status: StatusCode, msg: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": format!("{msg}") }))).into_response()
}

/// Reject empty required string fields with the field's wire name, matching
/// the original API's validation messages.
fn require(field: &str, value: &str) -> Result<(), Response> {
    if value.is_empty() {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("'{field}' is required."),
        ));
    }
    Ok(())
}

fn require_count(field: &str, value: u32) -> Result<(), Response> {
    if value == 0 {
        return Err(json_error(
            StatusCode::BAD_REQUEST,
            format!("'{field}' is required."),
        ));
    }
    Ok(())
}

fn study_error(e: StudyError) -> Response {
    match e {
        StudyError::Template(_) => {
            warn!("study request failed: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
        StudyError::Provider(ProviderError::Throttled(_)) => {
            warn!("provider throttled after retry");
            json_error(StatusCode::TOO_MANY_REQUESTS, THROTTLE_MESSAGE)
        }
        StudyError::Provider(e) => {
            warn!("provider request failed: {e}");
            json_error(StatusCode::BAD_GATEWAY, e)
        }
    }
}

fn reply_ok(reply: String) -> Response {
    (StatusCode::OK, Json(json!({ "reply": reply }))).into_response()
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let uptime = (chrono::Utc::now() - state.started_at).num_seconds();
    let body = json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "started_at": state.started_at.to_rfc3339(),
        "uptime_seconds": uptime,
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api — routes by the `action` field.
///
/// The body is read raw and parsed here, not via the `Json` extractor, so
/// malformed JSON gets the same `{ "error": message }` shape as every other
/// rejection.
pub(super) async fn dispatch(State(state): State<AppState>, body: Bytes) -> Response {
    let body: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return json_error(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"));
        }
    };

    if body.get("action").is_none() {
        return json_error(
            StatusCode::BAD_REQUEST,
            "No 'action' specified in request body.",
        );
    }

    let request: ApiRequest = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e),
    };

    match request {
        ApiRequest::GetSummary { notes_content } => {
            if let Err(resp) = require("notesContent", &notes_content) {
                return resp;
            }
            match state.service.summary(&notes_content).await {
                Ok(reply) => reply_ok(reply),
                Err(e) => study_error(e),
            }
        }

        ApiRequest::GetQuestions { notes_content, num_questions } => {
            if let Err(resp) = require("notesContent", &notes_content)
                .and_then(|()| require_count("numQuestions", num_questions))
            {
                return resp;
            }
            match state.service.questions(&notes_content, num_questions).await {
                Ok(reply) => reply_ok(reply),
                Err(e) => study_error(e),
            }
        }

        ApiRequest::GetFlashCards { notes_content, num_cards } => {
            if let Err(resp) = require("notesContent", &notes_content)
                .and_then(|()| require_count("numCards", num_cards))
            {
                return resp;
            }
            match state.service.flashcards(&notes_content, num_cards).await {
                Ok(reply) => reply_ok(reply),
                Err(e) => study_error(e),
            }
        }

        ApiRequest::CheckAnswer { notes_content, question, answer } => {
            if let Err(resp) = require("notesContent", &notes_content)
                .and_then(|()| require("question", &question))
                .and_then(|()| require("answer", &answer))
            {
                return resp;
            }
            match state.service.check_answer(&notes_content, &question, &answer).await {
                Ok(reply) => reply_ok(reply),
                Err(e) => study_error(e),
            }
        }

        ApiRequest::GetKeywords { prompt } => {
            if let Err(resp) = require("prompt", &prompt) {
                return resp;
            }
            match state.service.keywords(&prompt).await {
                Ok(keywords) => {
                    (StatusCode::OK, Json(json!({ "keywords": keywords }))).into_response()
                }
                Err(e) => study_error(e),
            }
        }

        ApiRequest::Search { prompt, yaml_content } => {
            if let Err(resp) = require("prompt", &prompt)
                .and_then(|()| require("yamlContent", &yaml_content))
            {
                return resp;
            }
            let keywords = match state.service.keywords(&prompt).await {
                Ok(k) => k,
                Err(e) => return study_error(e),
            };
            match search::search_index(&yaml_content, &keywords) {
                Ok(results) => {
                    (StatusCode::OK, Json(json!({ "results": results }))).into_response()
                }
                Err(e @ (SearchError::Yaml(_) | SearchError::NotAMapping)) => {
                    json_error(StatusCode::BAD_REQUEST, e)
                }
            }
        }

        ApiRequest::ExtractText { file_path, max_chars } => {
            if let Err(resp) = require("filePath", &file_path) {
                return resp;
            }
            let path = expand_home(&file_path);
            let cap = match max_chars {
                Some(0) => {
                    return json_error(
                        StatusCode::BAD_REQUEST,
                        "'maxChars' must be greater than zero.",
                    );
                }
                Some(n) => n,
                None => state.extract_max_chars,
            };
            match extract::extract_for_prompt(&path, cap) {
                Ok(content) => {
                    (StatusCode::OK, Json(json!({ "content": content }))).into_response()
                }
                Err(e @ ExtractError::NotFound(_)) => json_error(StatusCode::NOT_FOUND, e),
                Err(e @ ExtractError::Unsupported(_)) => json_error(StatusCode::BAD_REQUEST, e),
                Err(e) => {
                    warn!(path = %path.display(), "extraction failed: {e}");
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, e)
                }
            }
        }
    }
}
