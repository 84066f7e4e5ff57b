//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory — called at startup.
//! Adding a new backend = new module + new match arm.

pub mod anthropic;
pub mod dummy;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML) and is `None`
/// for keyless local models.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider::echo())),
        "anthropic" => {
            let a = &config.anthropic;
            let p = anthropic::AnthropicProvider::new(
                a.api_base_url.clone(),
                a.model.clone(),
                a.temperature,
                a.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::Anthropic(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnthropicConfig, LlmConfig};

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            anthropic: AnthropicConfig {
                api_base_url: "http://localhost:0/v1/messages".into(),
                model: "test-model".into(),
                temperature: 0.0,
                max_tokens: 64,
                keyword_max_tokens: 32,
                timeout_seconds: 1,
                throttle_retry_seconds: 0,
            },
        }
    }

    #[test]
    fn builds_dummy() {
        let p = build(&llm_config("dummy"), None).unwrap();
        assert!(matches!(p, LlmProvider::Dummy(_)));
    }

    #[test]
    fn builds_anthropic() {
        let p = build(&llm_config("anthropic"), Some("key".into())).unwrap();
        assert!(matches!(p, LlmProvider::Anthropic(_)));
    }

    #[test]
    fn unknown_provider_errors() {
        let err = build(&llm_config("mystery-model"), None).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider(_)));
        assert!(err.to_string().contains("mystery-model"));
    }
}
