//! The optimizer/evaluator summary loop.
//!
//! The optimizer condenses the report into a ≤ 400-character broadcast
//! message; the evaluator grades it. The loop ends on an "excellent"
//! rating or after a bounded number of iterations.

use crate::application::agents::prompts;
use crate::application::agents::report::{BroadcastSummary, SummaryRating};
use crate::application::agents::schema;
use crate::domain::errors::AgentError;
use crate::domain::ports::{LlmProvider, LlmRequest, TokenUsage};
use serde::Deserialize;
use tracing::{debug, warn};

pub const MAX_ITERATIONS: u32 = 3;
pub const MAX_SUMMARY_CHARS: usize = 400;

#[derive(Debug, Deserialize)]
struct Evaluation {
    rating: SummaryRating,
    #[serde(default)]
    issues: Vec<String>,
}

/// Produce a graded broadcast summary for a rendered report.
///
/// Evaluator failures end the loop with the current draft rather than
/// failing the report; an optimizer failure propagates since there is
/// nothing to broadcast.
pub async fn summarize(
    llm: &dyn LlmProvider,
    report_markdown: &str,
    language: &str,
    usage: &mut TokenUsage,
) -> Result<BroadcastSummary, AgentError> {
    let mut feedback: Option<Vec<String>> = None;
    let mut draft = String::new();
    let mut rating = SummaryRating::Poor;

    for iteration in 1..=MAX_ITERATIONS {
        let user = match &feedback {
            None => format!("Report:\n\n{}", report_markdown),
            Some(issues) => format!(
                "Report:\n\n{}\n\nYour previous draft:\n{}\n\nEvaluator issues to fix:\n- {}",
                report_markdown,
                draft,
                issues.join("\n- ")
            ),
        };

        let response = llm
            .complete(LlmRequest::new(
                prompts::optimizer_system_prompt(language),
                user,
            ))
            .await?;
        *usage += response.usage;
        draft = clamp_chars(response.text.trim(), MAX_SUMMARY_CHARS);

        let eval_request = LlmRequest::new(
            prompts::evaluator_system_prompt(),
            format!("Report:\n\n{}\n\nSummary to grade:\n{}", report_markdown, draft),
        );
        match schema::invoke_structured::<Evaluation>(llm, eval_request, "summary_evaluator", usage)
            .await
        {
            Ok(eval) => {
                debug!(
                    "Summary iteration {}: rated {:?} ({} issues)",
                    iteration,
                    eval.rating,
                    eval.issues.len()
                );
                rating = eval.rating;
                if rating == SummaryRating::Excellent {
                    return Ok(BroadcastSummary {
                        text: draft,
                        rating,
                        iterations: iteration,
                    });
                }
                feedback = Some(eval.issues);
            }
            Err(e) => {
                warn!("Summary evaluator failed, keeping current draft: {}", e);
                return Ok(BroadcastSummary {
                    text: draft,
                    rating,
                    iterations: iteration,
                });
            }
        }
    }

    Ok(BroadcastSummary {
        text: draft,
        rating,
        iterations: MAX_ITERATIONS,
    })
}

/// Truncate on a char boundary; the broadcast slot budget is hard.
fn clamp_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
