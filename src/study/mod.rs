//! Study operations — the service layer between the HTTP surface and the
//! LLM provider.
//!
//! Every operation follows the same shape: seed the conversation with the
//! user's notes, append a task prompt loaded from `config/prompts/`, do one
//! model round-trip. A throttled call is retried once after a configurable
//! delay; a second throttle propagates to the caller.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{LlmProvider, Message, ProviderError};
use crate::prompt::PromptBuilder;

/// Fixed assistant acknowledgement that closes the notes-seeding turn.
const NOTES_ACK: &str = "Okay, I have received the notes. What should I do with them?";

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("prompt template '{0}' is missing or empty")]
    Template(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Owns the configured provider and the prompt templates.
///
/// Cheap to clone — the provider is internally reference-counted and the
/// rest is small config data.
#[derive(Debug, Clone)]
pub struct StudyService {
    provider: LlmProvider,
    prompts_dir: PathBuf,
    max_tokens: u32,
    keyword_max_tokens: u32,
    throttle_retry: Duration,
}

impl StudyService {
    pub fn new(
        provider: LlmProvider,
        prompts_dir: impl Into<PathBuf>,
        max_tokens: u32,
        keyword_max_tokens: u32,
        throttle_retry: Duration,
    ) -> Self {
        Self {
            provider,
            prompts_dir: prompts_dir.into(),
            max_tokens,
            keyword_max_tokens,
            throttle_retry,
        }
    }

    /// Seed the conversation with the raw notes and a fixed acknowledgement.
    /// Blank or whitespace-only notes yield an empty history.
    pub fn base_history(notes: &str) -> Vec<Message> {
        if notes.trim().is_empty() {
            return Vec::new();
        }
        vec![Message::user(notes), Message::assistant(NOTES_ACK)]
    }

    /// Generate a prose summary of the notes (~30% of their size).
    pub async fn summary(&self, notes: &str) -> Result<String, StudyError> {
        let prompt = self.load_prompt("summary.txt", &[])?;
        self.ask_about_notes(notes, prompt, self.max_tokens).await
    }

    /// Generate `num` exam-style questions, newline-separated, unnumbered.
    pub async fn questions(&self, notes: &str, num: u32) -> Result<String, StudyError> {
        let prompt = self.load_prompt("questions.txt", &[("num", &num.to_string())])?;
        self.ask_about_notes(notes, prompt, self.max_tokens).await
    }

    /// Generate `num` flashcards as alternating question/answer lines.
    pub async fn flashcards(&self, notes: &str, num: u32) -> Result<String, StudyError> {
        let prompt = self.load_prompt("flashcards.txt", &[("num", &num.to_string())])?;
        self.ask_about_notes(notes, prompt, self.max_tokens).await
    }

    /// Grade `answer` against `question`: a yes/no verdict line followed by
    /// feedback.
    pub async fn check_answer(
        &self,
        notes: &str,
        question: &str,
        answer: &str,
    ) -> Result<String, StudyError> {
        let prompt = self.load_prompt(
            "check_answer.txt",
            &[("question", question), ("answer", answer)],
        )?;
        self.ask_about_notes(notes, prompt, self.max_tokens).await
    }

    /// Extract keywords for `prompt`, in relevance order.
    ///
    /// No notes history — the keyword request stands alone, with a smaller
    /// token budget. The reply is split on newlines; blanks are dropped.
    pub async fn keywords(&self, prompt: &str) -> Result<Vec<String>, StudyError> {
        let text = self.load_prompt("keywords.txt", &[("prompt", prompt)])?;
        let messages = vec![Message::user(text)];
        let reply = self
            .complete_with_retry(&messages, self.keyword_max_tokens)
            .await?;
        let keywords: Vec<String> = reply
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = keywords.len(), "extracted keywords");
        Ok(keywords)
    }

    // ── internals ─────────────────────────────────────────────────────────────

    fn load_prompt(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, StudyError> {
        let mut builder = PromptBuilder::new(&self.prompts_dir).layer(name);
        for (k, v) in vars {
            builder = builder.var(k, *v);
        }
        let prompt = builder.build();
        if prompt.is_empty() {
            return Err(StudyError::Template(name.to_string()));
        }
        Ok(prompt)
    }

    /// The optional system prompt, loaded fresh per request so edits to the
    /// template file take effect without a restart.
    fn system_prompt(&self) -> Option<String> {
        let text = PromptBuilder::new(&self.prompts_dir).layer("system.txt").build();
        if text.is_empty() { None } else { Some(text) }
    }

    async fn ask_about_notes(
        &self,
        notes: &str,
        prompt: String,
        max_tokens: u32,
    ) -> Result<String, StudyError> {
        let mut messages = Self::base_history(notes);
        messages.push(Message::user(prompt));
        Ok(self.complete_with_retry(&messages, max_tokens).await?)
    }

    /// One round-trip, retried once on throttle after the configured delay.
    async fn complete_with_retry(
        &self,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let system = self.system_prompt();
        match self.provider.complete(messages, system.as_deref(), max_tokens).await {
            Err(ProviderError::Throttled(msg)) => {
                warn!(retry_in = ?self.throttle_retry, "provider throttled — retrying once: {msg}");
                tokio::time::sleep(self.throttle_retry).await;
                self.provider.complete(messages, system.as_deref(), max_tokens).await
            }
            other => other,
        }
    }
}
