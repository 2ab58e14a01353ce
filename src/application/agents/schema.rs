//! Structured-output validation for agent responses.
//!
//! Free-text cleanup (fence stripping, brace isolation) runs before schema
//! validation; a failed parse earns exactly one corrective re-prompt, after
//! which the agent is treated as failed.

use crate::domain::errors::AgentError;
use crate::domain::ports::{LlmProvider, LlmRequest, TokenUsage};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Isolate the JSON object inside a model response: strips markdown fences
/// and leading/trailing prose around the outermost `{ ... }`.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let payload = extract_json(text).ok_or_else(|| "no JSON object in response".to_string())?;
    serde_json::from_str(payload).map_err(|e| e.to_string())
}

/// Invoke the LLM expecting a `T`-shaped JSON object, with one targeted
/// repair attempt on schema failure. Token usage accumulates into `usage`
/// across both attempts.
pub async fn invoke_structured<T: DeserializeOwned>(
    llm: &dyn LlmProvider,
    request: LlmRequest,
    agent: &str,
    usage: &mut TokenUsage,
) -> Result<T, AgentError> {
    let response = llm.complete(request.clone()).await?;
    *usage += response.usage;

    match parse_structured::<T>(&response.text) {
        Ok(value) => Ok(value),
        Err(first_error) => {
            warn!("{}: schema mismatch, attempting repair: {}", agent, first_error);

            let repair = LlmRequest {
                system: request.system.clone(),
                user: format!(
                    "Your previous response could not be parsed: {}\n\n\
                     Previous response:\n{}\n\n\
                     Respond again with ONLY the corrected JSON object, no prose, no code fences.",
                    first_error, response.text
                ),
                temperature: 0.0,
                max_tokens: request.max_tokens,
            };

            let retry = llm.complete(repair).await?;
            *usage += retry.usage;

            parse_structured::<T>(&retry.text).map_err(|detail| AgentError::SchemaViolation {
                agent: agent.to_string(),
                detail,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Verdict {
        should_sell: bool,
        confidence: f64,
    }

    #[test]
    fn test_parse_plain_json() {
        let v: Verdict = parse_structured(r#"{"should_sell": true, "confidence": 0.8}"#).unwrap();
        assert!(v.should_sell);
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "Here is my answer:\n```json\n{\"should_sell\": false, \"confidence\": 0.3}\n```\nDone.";
        let v: Verdict = parse_structured(text).unwrap();
        assert!(!v.should_sell);
        assert!((v.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(parse_structured::<Verdict>(r#"{"should_sell": true}"#).is_err());
        assert!(parse_structured::<Verdict>("no json here at all").is_err());
    }
}
