//! Post-trade retrospective generation.

use crate::application::agents::{prompts, schema};
use crate::application::memory::TradingMemory;
use crate::domain::memory::journal::{CompressionLayer, JournalEntry, Principle, PrincipleScope};
use crate::domain::ports::{LlmRequest, TokenUsage};
use crate::domain::trading::types::Trade;
use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct JournalDraft {
    situation_analysis: String,
    judgment_evaluation: String,
    #[serde(default)]
    lessons: Vec<String>,
    #[serde(default)]
    pattern_tags: Vec<String>,
    one_line_summary: String,
    confidence: f64,
    #[serde(default)]
    principle: Option<PrincipleDraft>,
}

#[derive(Debug, Deserialize)]
struct PrincipleDraft {
    condition: String,
    action: String,
    reason: String,
    scope: PrincipleScope,
}

impl TradingMemory {
    /// Generate and persist the layer-1 retrospective for a closed trade.
    ///
    /// The journal-generator agent writes the narrative; if it fails, a
    /// deterministic skeleton entry is stored instead so the trade is
    /// never lost to memory. Returns false when the trade was already
    /// journaled (append-only, once per trade per layer).
    pub async fn write_journal(
        &self,
        trade: &Trade,
        buy_context: &str,
        sell_context: &str,
    ) -> Result<bool> {
        let mut usage = TokenUsage::default();
        let request = LlmRequest::new(
            prompts::journal_system_prompt(),
            format!(
                "Trade:\nticker={} sector={} trigger={}\nbuy {} @ {} / sell {} @ {} ({})\n\
                 profit {:+.2}% over {} days\n\nScenario rationale: {}\n\n\
                 Buy context:\n{}\n\nSell context:\n{}",
                trade.ticker,
                trade.sector,
                trade.trigger,
                trade.buy_date,
                trade.buy_price,
                trade.sell_date,
                trade.sell_price,
                trade.sell_reason,
                trade.profit_rate * 100.0,
                trade.holding_days,
                trade.scenario.rationale,
                buy_context,
                sell_context,
            ),
        );

        let draft = match schema::invoke_structured::<JournalDraft>(
            self.llm.as_ref(),
            request,
            "journal_generator",
            &mut usage,
        )
        .await
        {
            Ok(draft) => draft,
            Err(e) => {
                warn!("Journal agent failed for {}, storing skeleton: {}", trade.ticker, e);
                JournalDraft {
                    situation_analysis: format!(
                        "{} entered on {} at {}, exited {} at {} ({}).",
                        trade.ticker,
                        trade.buy_date,
                        trade.buy_price,
                        trade.sell_date,
                        trade.sell_price,
                        trade.sell_reason
                    ),
                    judgment_evaluation: String::new(),
                    lessons: vec![],
                    pattern_tags: vec![],
                    one_line_summary: format!(
                        "{} {} {:+.2}%",
                        trade.ticker,
                        trade.trigger,
                        trade.profit_rate * 100.0
                    ),
                    confidence: 0.0,
                    principle: None,
                }
            }
        };

        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            trade_id: trade.id.clone(),
            ticker: trade.ticker.clone(),
            sector: trade.sector.clone(),
            trigger: trade.trigger,
            buy_date: trade.buy_date,
            sell_date: trade.sell_date,
            sell_reason: trade.sell_reason,
            profit_rate: trade.profit_rate,
            buy_context: buy_context.to_string(),
            sell_context: sell_context.to_string(),
            situation_analysis: draft.situation_analysis,
            judgment_evaluation: draft.judgment_evaluation,
            lessons: draft.lessons,
            pattern_tags: draft.pattern_tags,
            one_line_summary: draft.one_line_summary,
            confidence: draft.confidence.clamp(0.0, 1.0),
            layer: CompressionLayer::Detailed,
            compressed_summary: None,
            created_at: Utc::now(),
        };

        let inserted = self.journals.insert(&entry).await?;
        if !inserted {
            info!("Trade {} already journaled, skipping", trade.id);
            return Ok(false);
        }

        if let Some(p) = draft.principle {
            let principle = Principle {
                id: Uuid::new_v4().to_string(),
                condition: p.condition,
                action: p.action,
                reason: p.reason,
                scope: p.scope,
                supporting_trades: 1,
                success_rate: if trade.is_win() { 1.0 } else { 0.0 },
                is_active: true,
                source_journal_ids: vec![entry.id.clone()],
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.knowledge
                .upsert_principle(trade.ticker.realm, &principle)
                .await?;
        }

        info!("Journal written for {} ({})", trade.ticker, entry.id);
        Ok(true)
    }
}
