//! Anthropic-style messages provider (`/v1/messages`).
//!
//! Exposes a single `complete(&[Message], system, max_tokens)` interface
//! matching the rest of the `LlmProvider` abstraction. All wire types are
//! private to this module — callers never see them. History assembly belongs
//! to the study layer; this provider is stateless and does one round-trip.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{Message, ProviderError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing the Anthropic messages format.
///
/// Covers the hosted Anthropic API and gateways that re-expose it (Bedrock
/// proxies, LiteLLM and similar). Constructed once at startup, then cheaply
/// cloned because `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl AnthropicProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless gateways. When present it is sent as
    /// an `x-api-key` header on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    /// Send the conversation and return the model's text reply.
    pub async fn complete(
        &self,
        messages: &[Message],
        system: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let payload = MessagesRequest {
            model: &self.model,
            system,
            messages,
            max_tokens,
            temperature: self.temperature,
        };

        debug!(
            model = %self.model,
            turns = messages.len(),
            max_tokens,
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self
            .client
            .post(&self.api_base_url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload);
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<MessagesResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(blocks = parsed.content.len(), "received LLM response");

        reply_text(&parsed)
    }
}

/// Reply text is the concatenation of all text-type content blocks.
/// An empty or whitespace-only reply is an error, never an empty `Ok`.
fn reply_text(parsed: &MessagesResponse) -> Result<String, ProviderError> {
    let text: String = parsed
        .content
        .iter()
        .filter(|b| b.kind == "text")
        .filter_map(|b| b.text.as_deref())
        .collect();
    let text = text.trim().to_string();

    if text.is_empty() {
        return Err(ProviderError::Request("empty or missing content in response".into()));
    }
    Ok(text)
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

// Error envelope used by the Anthropic API.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Consume the response and return it if successful, or a structured error.
/// HTTP 429 maps to [`ProviderError::Throttled`] so callers can retry.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let kind = env.error.kind.map(|k| format!(" [{k}]")).unwrap_or_default();
        format!("HTTP {status}{kind}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "LLM request returned HTTP error");
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::Throttled(message));
    }
    Err(ProviderError::Request(message))
}
