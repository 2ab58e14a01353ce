//! LLM provider configuration from environment variables.

use anyhow::{Context, Result};
use std::env;

/// OpenAI-compatible chat-completions endpoint configuration.
///
/// `LLM_API_KEY` is the one hard requirement of the whole pipeline; the
/// process refuses to start without it.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Outer timeout applied to every section call, seconds.
    pub request_timeout_secs: u64,
    /// Fixed pause between analytical sections, seconds.
    pub section_pause_secs: u64,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .context("LLM_API_KEY (or OPENAI_API_KEY) must be set")?;

        Ok(Self {
            api_key,
            base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            request_timeout_secs: parse_env("LLM_REQUEST_TIMEOUT_SECS", 180),
            section_pause_secs: parse_env("LLM_SECTION_PAUSE_SECS", 2),
        })
    }
}

fn parse_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
