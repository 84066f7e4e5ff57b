//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `NOTETUTOR_BIND` and `NOTETUTOR_LOG_LEVEL` env overrides.
//! The provider API key comes only from the `LLM_API_KEY` env var.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Anthropic-style messages-endpoint provider configuration.
/// Populated from `[llm.anthropic]` in the TOML.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// Full messages endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Token budget for long-form replies (summaries, questions, feedback).
    pub max_tokens: u32,
    /// Smaller token budget for keyword extraction.
    pub keyword_max_tokens: u32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Delay before the single retry after a throttled call.
    pub throttle_retry_seconds: u64,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (e.g. `"dummy"`, `"anthropic"`).
    /// Maps to `default` in `[llm]` TOML — named `default` there to signal
    /// that other provider sections can coexist without being loaded.
    pub provider: String,
    /// Config for the Anthropic-style provider (`[llm.anthropic]`).
    pub anthropic: AnthropicConfig,
}

/// Fully-resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Socket address the HTTP server binds to.
    pub bind: String,
    pub log_level: String,
    /// Directory holding prompt template files (already expanded, no `~`).
    pub prompts_dir: PathBuf,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var — `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
    /// Character cap applied to extracted document text.
    pub extract_max_chars: usize,
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    prompts: RawPrompts,
    #[serde(default)]
    extract: RawExtract,
}

#[derive(Deserialize)]
struct RawServer {
    #[serde(default = "default_bind")]
    bind: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawServer {
    fn default() -> Self {
        Self { bind: default_bind(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    anthropic: RawAnthropicConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), anthropic: RawAnthropicConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawAnthropicConfig {
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_model")]
    model: String,
    #[serde(default = "default_temperature")]
    temperature: f32,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_keyword_max_tokens")]
    keyword_max_tokens: u32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_throttle_retry_seconds")]
    throttle_retry_seconds: u64,
}

impl Default for RawAnthropicConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            keyword_max_tokens: default_keyword_max_tokens(),
            timeout_seconds: default_timeout_seconds(),
            throttle_retry_seconds: default_throttle_retry_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawPrompts {
    #[serde(default = "default_prompts_dir")]
    dir: String,
}

impl Default for RawPrompts {
    fn default() -> Self {
        Self { dir: default_prompts_dir() }
    }
}

#[derive(Deserialize)]
struct RawExtract {
    #[serde(default = "default_extract_max_chars")]
    max_chars: usize,
}

impl Default for RawExtract {
    fn default() -> Self {
        Self { max_chars: default_extract_max_chars() }
    }
}

fn default_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_provider() -> String { "anthropic".to_string() }
fn default_api_base_url() -> String { "https://api.anthropic.com/v1/messages".to_string() }
fn default_model() -> String { "claude-3-haiku-20240307".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> u32 { 2048 }
fn default_keyword_max_tokens() -> u32 { 500 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_throttle_retry_seconds() -> u64 { 5 }
fn default_prompts_dir() -> String { "config/prompts".to_string() }
fn default_extract_max_chars() -> usize { 20_000 }

/// Load config from `config/default.toml`, then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let bind_override = env::var("NOTETUTOR_BIND").ok();
    let log_level_override = env::var("NOTETUTOR_LOG_LEVEL").ok();
    load_from(
        Path::new("config/default.toml"),
        bind_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    bind_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let bind = bind_override.unwrap_or(&parsed.server.bind).to_string();
    let log_level = log_level_override.unwrap_or(&parsed.server.log_level).to_string();
    let a = parsed.llm.anthropic;

    Ok(Config {
        bind,
        log_level,
        prompts_dir: expand_home(&parsed.prompts.dir),
        llm: LlmConfig {
            provider: parsed.llm.provider,
            anthropic: AnthropicConfig {
                api_base_url: a.api_base_url,
                model: a.model,
                temperature: a.temperature,
                max_tokens: a.max_tokens,
                keyword_max_tokens: a.keyword_max_tokens,
                timeout_seconds: a.timeout_seconds,
                throttle_retry_seconds: a.throttle_retry_seconds,
            },
        },
        llm_api_key: env::var("LLM_API_KEY").ok(),
        extract_max_chars: parsed.extract.max_chars,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
