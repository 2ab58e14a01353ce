//! The entry workflow: memory-informed, regime-gated, invariant-checked.

use crate::application::agents::report::TickerReport;
use crate::application::agents::{prompts, schema};
use crate::application::decision::gates;
use crate::application::memory::TradingMemory;
use crate::application::screener::ScoredCandidate;
use crate::application::session::SessionContext;
use crate::config::TradingConfig;
use crate::domain::market::regime::Regime;
use crate::domain::ports::{LlmProvider, LlmRequest, TokenUsage};
use crate::domain::trading::portfolio::Portfolio;
use crate::domain::trading::scenario::{InvestmentPeriod, Scenario};
use crate::domain::trading::types::{Holding, WatchlistEntry};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum BuyDecision {
    Bought(Box<Holding>),
    Skipped { reason: String },
}

#[derive(Debug, Deserialize)]
struct BuyAgentResponse {
    decision: String,
    buy_score: u8,
    entry_price: Option<Decimal>,
    target_price: Option<Decimal>,
    stop_loss_price: Option<Decimal>,
    investment_period: Option<InvestmentPeriod>,
    #[serde(default)]
    rationale: String,
    #[serde(default)]
    key_levels: Vec<String>,
    #[serde(default)]
    sell_triggers: Vec<String>,
    #[serde(default)]
    hold_conditions: Vec<String>,
    #[serde(default)]
    skip_reason: Option<String>,
}

pub struct BuyEngine {
    llm: Arc<dyn LlmProvider>,
    memory: Arc<TradingMemory>,
    trading: TradingConfig,
}

impl BuyEngine {
    pub fn new(llm: Arc<dyn LlmProvider>, memory: Arc<TradingMemory>, trading: TradingConfig) -> Self {
        Self {
            llm,
            memory,
            trading,
        }
    }

    /// Decide buy-or-skip for one analyzed ticker. Agent failures and
    /// invariant violations degrade to a skip; nothing is committed unless
    /// every check passes. Skips are recorded on the watchlist.
    pub async fn decide(
        &self,
        report: &TickerReport,
        scored: &ScoredCandidate,
        session: &SessionContext,
        regime: Regime,
        usage: &mut TokenUsage,
    ) -> Result<BuyDecision> {
        let ticker = &report.ticker;
        let trigger = scored.hit.trigger;
        let position_size = self.trading.position_size(session.realm);
        let capital_base = self.trading.capital_base(session.realm);

        let portfolio = self.memory.portfolio(session.realm, capital_base).await?;
        if portfolio.is_full() {
            let reason = "portfolio full: 10/10 holdings".to_string();
            info!("{}: refusing buy, {}", ticker, reason);
            return self.skip(report, 0, reason).await;
        }

        let context = self
            .memory
            .context_for_ticker(ticker, &report.sector, trigger)
            .await?;
        let (delta, delta_reasons) = self
            .memory
            .score_adjustment(ticker, &report.sector, trigger)
            .await?;

        let request = self.build_request(report, scored, &portfolio, regime, &context, delta, &delta_reasons);
        let response = match schema::invoke_structured::<BuyAgentResponse>(
            self.llm.as_ref(),
            request,
            "buy_agent",
            usage,
        )
        .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("{}: buy agent failed, degrading to skip: {}", ticker, e);
                return self
                    .skip(report, 0, format!("agent failure: {}", e))
                    .await;
            }
        };

        let buy_score = response.buy_score.min(10);
        if response.decision != "buy" {
            let reason = response
                .skip_reason
                .unwrap_or_else(|| "agent declined".to_string());
            return self.skip(report, buy_score, reason).await;
        }

        // The agent may move entry/target/stop within the trigger's rails;
        // anything missing falls back to the screener's levels.
        let scenario = Scenario {
            entry_price: response.entry_price.unwrap_or(scored.levels.current_price),
            target_price: response.target_price.unwrap_or(scored.levels.target_price),
            stop_loss_price: response
                .stop_loss_price
                .unwrap_or(scored.levels.stop_loss_price),
            investment_period: response.investment_period.unwrap_or(InvestmentPeriod::Short),
            buy_score,
            rationale: response.rationale,
            key_levels: response.key_levels,
            sell_triggers: response.sell_triggers,
            hold_conditions: response.hold_conditions,
        };

        if let Err(violation) = scenario.validate(trigger) {
            return self
                .skip(report, buy_score, format!("scenario invalid: {}", violation))
                .await;
        }

        let effective_score = (buy_score as i32 + delta).clamp(0, 10) as u8;
        if let Some(reason) = gates::rejection_reason(&scenario, effective_score, regime) {
            return self.skip(report, buy_score, reason).await;
        }

        if let Err(violation) =
            portfolio.check_admission(ticker, &report.sector, position_size)
        {
            return self
                .skip(report, buy_score, violation.to_string())
                .await;
        }

        let quantity = share_quantity(position_size, scenario.entry_price, session.realm);
        if quantity <= Decimal::ZERO {
            return self
                .skip(report, buy_score, "position size below one share".to_string())
                .await;
        }

        let holding = Holding {
            ticker: ticker.clone(),
            name: report.company_name.clone(),
            sector: report.sector.clone(),
            buy_price: scenario.entry_price,
            buy_date: session.trading_day,
            quantity,
            trigger,
            session: session.mode,
            scenario,
            scenario_history: vec![],
            current_price: scored.levels.current_price,
            last_updated: Utc::now(),
        };
        self.memory.create_holding(&holding).await?;

        info!(
            "{}: BUY accepted (score {} {:+}, {} regime)",
            ticker, buy_score, delta, regime
        );
        Ok(BuyDecision::Bought(Box::new(holding)))
    }

    async fn skip(
        &self,
        report: &TickerReport,
        buy_score: u8,
        reason: String,
    ) -> Result<BuyDecision> {
        info!("{}: skip: {}", report.ticker, reason);
        self.memory
            .record_watchlist(&WatchlistEntry {
                ticker: report.ticker.clone(),
                analyzed_date: report.reference_date,
                buy_score,
                decision: "skip".to_string(),
                skip_reason: reason.clone(),
                scenario: None,
            })
            .await?;
        Ok(BuyDecision::Skipped { reason })
    }

    #[allow(clippy::too_many_arguments)]
    fn build_request(
        &self,
        report: &TickerReport,
        scored: &ScoredCandidate,
        portfolio: &Portfolio,
        regime: Regime,
        context: &str,
        delta: i32,
        delta_reasons: &[String],
    ) -> LlmRequest {
        let holdings_block = if portfolio.holdings.is_empty() {
            "(no open positions)".to_string()
        } else {
            portfolio
                .holdings
                .iter()
                .map(|h| {
                    format!(
                        "  {} [{}] {:+.1}% since {}",
                        h.ticker,
                        h.sector,
                        h.profit_rate() * 100.0,
                        h.buy_date
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };

        let adjustment_block = if delta_reasons.is_empty() {
            String::new()
        } else {
            format!(
                "\nMemory score adjustment: {:+} ({})",
                delta,
                delta_reasons.join("; ")
            )
        };

        LlmRequest::new(
            prompts::buy_system_prompt(),
            format!(
                "Market regime: {}\n\nTrigger: {} (max stop {:.0}%, min R/R {:.1})\n\
                 Screener levels: current={} stop={} target={} (R/R {:.2})\n\n\
                 Portfolio ({}/{} slots):\n{}\n\n\
                 Trading memory context:\n{}{}\n\nReport:\n\n{}",
                regime,
                scored.hit.trigger,
                scored.hit.trigger.sl_max() * 100.0,
                scored.hit.trigger.rr_target(),
                scored.levels.current_price,
                scored.levels.stop_loss_price,
                scored.levels.target_price,
                scored.levels.risk_reward,
                portfolio.holdings.len(),
                crate::domain::trading::portfolio::MAX_HOLDINGS,
                holdings_block,
                context,
                adjustment_block,
                report.to_markdown(),
            ),
        )
    }
}

/// Whole shares in KR, hundredths elsewhere; never rounds up.
fn share_quantity(position_size: Decimal, price: Decimal, realm: crate::domain::market::ticker::Realm) -> Decimal {
    use crate::domain::market::ticker::Realm;
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let raw = position_size / price;
    match realm {
        Realm::Kr => raw.trunc(),
        Realm::Us => raw.trunc_with_scale(2),
    }
}
