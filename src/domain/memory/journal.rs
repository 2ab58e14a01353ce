use crate::domain::market::ticker::Ticker;
use crate::domain::trading::trigger::TriggerKind;
use crate::domain::trading::types::SellReason;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compression level of a journal entry.
///
/// ```text
/// [created: layer=1] --(>7d)--> [summarized: layer=2]
/// [summarized: layer=2] --(>30d)--> [compressed: layer=3]
/// [compressed: layer=3] --(>archive_days)--> [deleted]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
pub enum CompressionLayer {
    Detailed = 1,
    Summarized = 2,
    Compressed = 3,
}

impl CompressionLayer {
    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(CompressionLayer::Detailed),
            2 => Some(CompressionLayer::Summarized),
            3 => Some(CompressionLayer::Compressed),
            _ => None,
        }
    }
}

impl fmt::Display for CompressionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// A structured retrospective written after every closed trade.
///
/// Journals are append-only; a given trade appears at most once per layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub trade_id: String,
    pub ticker: Ticker,
    pub sector: String,
    pub trigger: TriggerKind,
    pub buy_date: NaiveDate,
    pub sell_date: NaiveDate,
    pub sell_reason: SellReason,
    pub profit_rate: f64,
    pub buy_context: String,
    pub sell_context: String,
    pub situation_analysis: String,
    pub judgment_evaluation: String,
    pub lessons: Vec<String>,
    pub pattern_tags: Vec<String>,
    pub one_line_summary: String,
    /// The retrospective agent's confidence in its own read, 0.0..=1.0.
    pub confidence: f64,
    pub layer: CompressionLayer,
    /// Filled when promoted to layer 2:
    /// `"{sector} + {trigger} → {action} → {outcome}"`.
    pub compressed_summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    pub fn outcome_label(&self) -> &'static str {
        if self.profit_rate > 0.0 { "win" } else { "loss" }
    }
}

/// A rule-shaped piece of derived knowledge mined from journals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principle {
    pub id: String,
    pub condition: String,
    pub action: String,
    pub reason: String,
    pub scope: PrincipleScope,
    pub supporting_trades: u32,
    pub success_rate: f64,
    pub is_active: bool,
    pub source_journal_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipleScope {
    Universal,
    Sector,
    Market,
}

impl fmt::Display for PrincipleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipleScope::Universal => write!(f, "universal"),
            PrincipleScope::Sector => write!(f, "sector"),
            PrincipleScope::Market => write!(f, "market"),
        }
    }
}

impl std::str::FromStr for PrincipleScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "universal" => Ok(PrincipleScope::Universal),
            "sector" => Ok(PrincipleScope::Sector),
            "market" => Ok(PrincipleScope::Market),
            _ => anyhow::bail!("Invalid principle scope: {}", s),
        }
    }
}

/// A pattern-shaped piece of derived knowledge, aggregated from layer-3
/// journals and keyed by `(category, subcategory, condition)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intuition {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub condition: String,
    pub insight: String,
    pub confidence: f64,
    pub supporting_trades: u32,
    pub success_rate: f64,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

/// One row of the per-analysis performance tracker; the 7/14/30-day prices
/// are filled in incrementally as the horizons elapse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRow {
    pub ticker: Ticker,
    pub analyzed_date: NaiveDate,
    pub trigger: TriggerKind,
    pub price_t0: Decimal,
    pub price_7d: Option<Decimal>,
    pub price_14d: Option<Decimal>,
    pub price_30d: Option<Decimal>,
}

impl PerformanceRow {
    pub fn return_at(&self, horizon: Option<Decimal>) -> Option<f64> {
        use rust_decimal::prelude::ToPrimitive;
        let price = horizon?;
        if self.price_t0 <= Decimal::ZERO {
            return None;
        }
        ((price - self.price_t0) / self.price_t0).to_f64()
    }
}

/// Aggregate over the tracker for one trigger. Only reported once at least
/// three analyses have matured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub trigger: TriggerKind,
    pub n: u32,
    pub win_rate: f64,
    pub avg_7d: f64,
    pub avg_14d: f64,
    pub avg_30d: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_layer_round_trip() {
        for layer in [
            CompressionLayer::Detailed,
            CompressionLayer::Summarized,
            CompressionLayer::Compressed,
        ] {
            assert_eq!(CompressionLayer::from_i64(layer.as_i64()), Some(layer));
        }
        assert_eq!(CompressionLayer::from_i64(0), None);
    }

    #[test]
    fn test_performance_row_returns() {
        let row = PerformanceRow {
            ticker: Ticker::us("WMT"),
            analyzed_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            trigger: TriggerKind::VolumeSurge,
            price_t0: dec!(100),
            price_7d: Some(dec!(105)),
            price_14d: None,
            price_30d: None,
        };
        assert!((row.return_at(row.price_7d).unwrap() - 0.05).abs() < 1e-9);
        assert!(row.return_at(row.price_14d).is_none());
    }
}
