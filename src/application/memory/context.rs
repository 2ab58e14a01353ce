//! The context/adjustment service: what the memory tells the decision
//! layer about a candidate before the buy agent sees it.

use crate::application::memory::TradingMemory;
use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::memory::journal::PerformanceStats;
use crate::domain::trading::trigger::TriggerKind;
use anyhow::Result;

/// Hard bound on the formatted context handed into prompts.
const MAX_CONTEXT_CHARS: usize = 2400;
const PRINCIPLE_LIMIT: usize = 5;
const INTUITION_LIMIT: usize = 5;
const RECENT_TRADE_LIMIT: usize = 3;

/// Recommended score delta range. The delta is advice, not a hard rule.
pub const MAX_SCORE_DELTA: i32 = 3;

impl TradingMemory {
    /// Aggregate tracker statistics for one trigger; absent until at
    /// least three analyses have matured.
    pub async fn performance_stats(
        &self,
        realm: Realm,
        trigger: TriggerKind,
    ) -> Result<Option<PerformanceStats>> {
        let rows = self.tracker.rows_for_trigger(realm, trigger).await?;
        let matured: Vec<_> = rows.iter().filter(|r| r.price_7d.is_some()).collect();
        let n = matured.len() as u32;
        if n < 3 {
            return Ok(None);
        }

        let returns_7d: Vec<f64> = matured
            .iter()
            .filter_map(|r| r.return_at(r.price_7d))
            .collect();
        let returns_14d: Vec<f64> = matured
            .iter()
            .filter_map(|r| r.return_at(r.price_14d))
            .collect();
        let returns_30d: Vec<f64> = matured
            .iter()
            .filter_map(|r| r.return_at(r.price_30d))
            .collect();

        let wins = returns_7d.iter().filter(|r| **r > 0.0).count() as f64;
        Ok(Some(PerformanceStats {
            trigger,
            n,
            win_rate: if returns_7d.is_empty() {
                0.0
            } else {
                wins / returns_7d.len() as f64
            },
            avg_7d: mean(&returns_7d),
            avg_14d: mean(&returns_14d),
            avg_30d: mean(&returns_30d),
        }))
    }

    /// A bounded, formatted context block for the buy agent: trigger
    /// statistics, same-ticker history, top universal principles and the
    /// sector's active intuitions.
    pub async fn context_for_ticker(
        &self,
        ticker: &Ticker,
        sector: &str,
        trigger: TriggerKind,
    ) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();

        if let Some(stats) = self.performance_stats(ticker.realm, trigger).await? {
            parts.push(format!(
                "Trigger track record ({}): n={}, win_rate={:.0}%, avg 7d {:+.1}% / 14d {:+.1}% / 30d {:+.1}%",
                stats.trigger,
                stats.n,
                stats.win_rate * 100.0,
                stats.avg_7d * 100.0,
                stats.avg_14d * 100.0,
                stats.avg_30d * 100.0,
            ));
        }

        let recent = self
            .trades
            .recent_for_ticker(ticker, RECENT_TRADE_LIMIT)
            .await?;
        if !recent.is_empty() {
            let lines: Vec<String> = recent
                .iter()
                .map(|t| {
                    format!(
                        "  {} {} → {} {:+.1}% ({})",
                        t.buy_date,
                        t.trigger,
                        t.sell_date,
                        t.profit_rate * 100.0,
                        t.sell_reason
                    )
                })
                .collect();
            parts.push(format!("Past trades on {}:\n{}", ticker, lines.join("\n")));
        }

        let principles = self
            .knowledge
            .active_principles(ticker.realm, self.config.min_supporting_trades, PRINCIPLE_LIMIT)
            .await?;
        if !principles.is_empty() {
            let lines: Vec<String> = principles
                .iter()
                .map(|p| {
                    format!(
                        "  IF {} THEN {} (n={}, {:.0}% success)",
                        p.condition,
                        p.action,
                        p.supporting_trades,
                        p.success_rate * 100.0
                    )
                })
                .collect();
            parts.push(format!("Principles:\n{}", lines.join("\n")));
        }

        let intuitions = self
            .knowledge
            .active_intuitions(ticker.realm, Some(sector), INTUITION_LIMIT)
            .await?;
        if !intuitions.is_empty() {
            let lines: Vec<String> = intuitions
                .iter()
                .map(|i| {
                    format!(
                        "  [{}/{}] {} (n={}, {:.0}% success)",
                        i.category,
                        i.subcategory,
                        i.insight,
                        i.supporting_trades,
                        i.success_rate * 100.0
                    )
                })
                .collect();
            parts.push(format!("Intuitions for {}:\n{}", sector, lines.join("\n")));
        }

        if parts.is_empty() {
            return Ok("No trading history yet for this context.".to_string());
        }

        let mut text = parts.join("\n\n");
        if text.chars().count() > MAX_CONTEXT_CHARS {
            text = text.chars().take(MAX_CONTEXT_CHARS).collect();
        }
        Ok(text)
    }

    /// Recommend an integer adjustment to the buy score, with reasons.
    /// Clamped to `[-MAX_SCORE_DELTA, MAX_SCORE_DELTA]`.
    pub async fn score_adjustment(
        &self,
        ticker: &Ticker,
        sector: &str,
        trigger: TriggerKind,
    ) -> Result<(i32, Vec<String>)> {
        let mut delta = 0i32;
        let mut reasons = Vec::new();

        if let Some(stats) = self.performance_stats(ticker.realm, trigger).await? {
            if stats.n >= 5 && stats.win_rate >= 0.6 {
                delta += 1;
                reasons.push(format!(
                    "{} historically strong ({:.0}% over {} analyses)",
                    trigger,
                    stats.win_rate * 100.0,
                    stats.n
                ));
            } else if stats.n >= 5 && stats.win_rate <= 0.4 {
                delta -= 1;
                reasons.push(format!(
                    "{} historically weak ({:.0}% over {} analyses)",
                    trigger,
                    stats.win_rate * 100.0,
                    stats.n
                ));
            }
        }

        let recent = self
            .trades
            .recent_for_ticker(ticker, RECENT_TRADE_LIMIT)
            .await?;
        if recent.len() >= 2 && recent.iter().all(|t| !t.is_win()) {
            delta -= 1;
            reasons.push(format!(
                "{} lost on the last {} attempts",
                ticker,
                recent.len()
            ));
        } else if !recent.is_empty() {
            let avg = recent.iter().map(|t| t.profit_rate).sum::<f64>() / recent.len() as f64;
            if avg > 0.05 {
                delta += 1;
                reasons.push(format!(
                    "{} averaged {:+.1}% on recent trades",
                    ticker,
                    avg * 100.0
                ));
            }
        }

        let intuitions = self
            .knowledge
            .active_intuitions(ticker.realm, Some(sector), 1)
            .await?;
        if let Some(best) = intuitions.first() {
            if best.supporting_trades >= 3 && best.success_rate >= 0.65 {
                delta += 1;
                reasons.push(format!("sector pattern favorable: {}", best.insight));
            } else if best.supporting_trades >= 3 && best.success_rate <= 0.35 {
                delta -= 1;
                reasons.push(format!("sector pattern unfavorable: {}", best.insight));
            }
        }

        Ok((delta.clamp(-MAX_SCORE_DELTA, MAX_SCORE_DELTA), reasons))
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
