//! Per-language summary translation for multi-language broadcast.

use crate::application::agents::prompts;
use crate::domain::errors::UpstreamError;
use crate::domain::ports::{LlmProvider, LlmRequest, TokenUsage};

/// Translate a broadcast summary, preserving numbers, tickers and line
/// structure. The source language needs no translation pass.
pub async fn translate(
    llm: &dyn LlmProvider,
    text: &str,
    source_language: &str,
    target_language: &str,
    usage: &mut TokenUsage,
) -> Result<String, UpstreamError> {
    if source_language.eq_ignore_ascii_case(target_language) {
        return Ok(text.to_string());
    }

    let response = llm
        .complete(LlmRequest {
            system: prompts::translator_system_prompt(target_language),
            user: text.to_string(),
            temperature: 0.1,
            max_tokens: 1024,
        })
        .await?;
    *usage += response.usage;
    Ok(response.text.trim().to_string())
}
