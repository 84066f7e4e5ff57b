//! Dummy LLM provider — replies with a canned string, or echoes the last
//! user turn prefixed with `[echo]`. Can also simulate rate limiting for a
//! set number of calls. Used for testing the full request round-trip
//! without a real API key.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::llm::{Message, ProviderError, Role};

#[derive(Debug, Clone)]
pub struct DummyProvider {
    reply: Option<String>,
    /// Remaining calls that answer with `Throttled`. Shared across clones so
    /// retry loops observe the same countdown.
    throttle_remaining: Arc<AtomicU32>,
}

impl DummyProvider {
    /// Echo mode: replies `[echo] <last user message>`.
    pub fn echo() -> Self {
        Self { reply: None, throttle_remaining: Arc::new(AtomicU32::new(0)) }
    }

    /// Canned mode: always replies with `reply`, regardless of input.
    pub fn canned(reply: impl Into<String>) -> Self {
        Self { reply: Some(reply.into()), throttle_remaining: Arc::new(AtomicU32::new(0)) }
    }

    /// Throttle mode: the first `times` calls fail with
    /// [`ProviderError::Throttled`], then `reply` is returned.
    pub fn throttled(times: u32, reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            throttle_remaining: Arc::new(AtomicU32::new(times)),
        }
    }

    pub async fn complete(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let was_throttling = self
            .throttle_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if was_throttling {
            return Err(ProviderError::Throttled("simulated rate limit".into()));
        }

        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(format!("[echo] {last_user}"))
    }
}
