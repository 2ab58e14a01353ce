//! The exit sweep over existing holdings.
//!
//! Runs independently of the screener. A breached stop sells without
//! consulting the agent; target hits, scenario expiry and soft triggers go
//! through the sell agent, which may also adjust the scenario instead.

use crate::application::agents::{prompts, schema};
use crate::application::memory::TradingMemory;
use crate::application::session::SessionContext;
use crate::domain::market::regime::Regime;
use crate::domain::ports::{LlmProvider, LlmRequest, MarketDataProvider, TokenUsage};
use crate::domain::trading::types::{Holding, SellReason, Trade};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum SellOutcome {
    Sold(Box<Trade>),
    Held { ticker: String },
    Adjusted { ticker: String },
    Failed { ticker: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct SellVerdict {
    should_sell: bool,
    #[serde(default)]
    sell_reason: String,
    confidence: f64,
    #[serde(default)]
    adjustment: Option<ScenarioAdjustment>,
}

#[derive(Debug, Deserialize)]
struct ScenarioAdjustment {
    target_price: Decimal,
    stop_loss_price: Decimal,
}

pub struct SellEngine {
    llm: Arc<dyn LlmProvider>,
    memory: Arc<TradingMemory>,
    market: Arc<dyn MarketDataProvider>,
}

impl SellEngine {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        memory: Arc<TradingMemory>,
        market: Arc<dyn MarketDataProvider>,
    ) -> Self {
        Self { llm, memory, market }
    }

    /// Refresh prices and evaluate every holding. Each position completes
    /// fully before the next is considered; agent failures degrade to
    /// hold.
    pub async fn sweep(
        &self,
        session: &SessionContext,
        regime: Regime,
        capital_base: Decimal,
        usage: &mut TokenUsage,
    ) -> Result<Vec<SellOutcome>> {
        let portfolio = self.memory.portfolio(session.realm, capital_base).await?;
        let mut outcomes = Vec::with_capacity(portfolio.holdings.len());

        for mut holding in portfolio.holdings {
            let ticker = holding.ticker.to_string();
            let outcome = match self.evaluate(&mut holding, session, regime, usage).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("{}: sell evaluation failed, holding: {}", ticker, e);
                    SellOutcome::Failed {
                        ticker,
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn evaluate(
        &self,
        holding: &mut Holding,
        session: &SessionContext,
        regime: Regime,
        usage: &mut TokenUsage,
    ) -> Result<SellOutcome> {
        let ticker = holding.ticker.clone();

        // 1. Refresh the price; an unreachable quote means we hold.
        let price = match self.market.quote(&ticker).await {
            Ok(p) => p,
            Err(e) => {
                warn!("{}: quote refresh failed, holding: {}", ticker, e);
                return Ok(SellOutcome::Held {
                    ticker: ticker.to_string(),
                });
            }
        };
        holding.current_price = price;
        self.memory.refresh_price(&ticker, price).await?;

        // 2. A breached stop is non-negotiable.
        if price <= holding.scenario.stop_loss_price {
            info!(
                "{}: stop breached ({} <= {})",
                ticker, price, holding.scenario.stop_loss_price
            );
            let trade = self
                .close(holding, price, session, SellReason::StopLoss, "stop-loss breach")
                .await?;
            return Ok(SellOutcome::Sold(Box::new(trade)));
        }

        let target_hit = price >= holding.scenario.target_price;
        let holding_days = holding.holding_days(session.trading_day);
        let expired = holding_days > holding.scenario.investment_period.expiry_days();

        // 3. Consult the sell agent.
        let verdict = match schema::invoke_structured::<SellVerdict>(
            self.llm.as_ref(),
            self.build_request(holding, price, regime, target_hit, expired, holding_days),
            "sell_agent",
            usage,
        )
        .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!("{}: sell agent failed, degrading to hold: {}", ticker, e);
                return Ok(SellOutcome::Held {
                    ticker: ticker.to_string(),
                });
            }
        };

        if verdict.should_sell {
            let reason = if target_hit {
                SellReason::TargetReached
            } else if expired {
                SellReason::ScenarioExpired
            } else {
                SellReason::AgentDecision
            };
            let context = format!(
                "{} (confidence {:.2})",
                if verdict.sell_reason.is_empty() {
                    reason.to_string()
                } else {
                    verdict.sell_reason.clone()
                },
                verdict.confidence
            );
            let trade = self.close(holding, price, session, reason, &context).await?;
            return Ok(SellOutcome::Sold(Box::new(trade)));
        }

        // 4. Scenario adjustment: mutate levels, preserving the old
        //    scenario in history.
        if let Some(adjustment) = verdict.adjustment {
            let mut adjusted = holding.scenario.clone();
            adjusted.target_price = adjustment.target_price;
            adjusted.stop_loss_price = adjustment.stop_loss_price;

            if adjusted.stop_loss_price < adjusted.target_price
                && adjusted.stop_loss_price > Decimal::ZERO
            {
                holding.adjust_scenario(adjusted);
                self.memory.update_holding(holding).await?;
                info!(
                    "{}: scenario adjusted (target {}, stop {})",
                    ticker, adjustment.target_price, adjustment.stop_loss_price
                );
                return Ok(SellOutcome::Adjusted {
                    ticker: ticker.to_string(),
                });
            }
            warn!("{}: rejected incoherent adjustment", ticker);
        }

        Ok(SellOutcome::Held {
            ticker: ticker.to_string(),
        })
    }

    async fn close(
        &self,
        holding: &Holding,
        price: Decimal,
        session: &SessionContext,
        reason: SellReason,
        sell_context: &str,
    ) -> Result<Trade> {
        self.memory
            .close_trade(
                holding,
                price,
                session.trading_day,
                reason,
                &holding.scenario.rationale,
                sell_context,
            )
            .await
    }

    fn build_request(
        &self,
        holding: &Holding,
        price: Decimal,
        regime: Regime,
        target_hit: bool,
        expired: bool,
        holding_days: i64,
    ) -> LlmRequest {
        let flags = [
            target_hit.then_some("target reached"),
            expired.then_some("scenario expired"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");

        LlmRequest::new(
            prompts::sell_system_prompt(),
            format!(
                "Market regime: {}\n\nHolding: {} ({}) x{}\n\
                 bought {} @ {} / current {} ({:+.2}%)\nheld {} days ({} plan)\n\
                 Scenario: entry={} target={} stop={}\nRationale: {}\n\
                 Sell triggers: {}\nHold conditions: {}\n\
                 Status flags: {}",
                regime,
                holding.ticker,
                holding.sector,
                holding.quantity,
                holding.buy_date,
                holding.buy_price,
                price,
                holding.profit_rate() * 100.0,
                holding_days,
                holding.scenario.investment_period,
                holding.scenario.entry_price,
                holding.scenario.target_price,
                holding.scenario.stop_loss_price,
                holding.scenario.rationale,
                holding.scenario.sell_triggers.join("; "),
                holding.scenario.hold_conditions.join("; "),
                if flags.is_empty() { "none" } else { flags.as_str() },
            ),
        )
    }
}
