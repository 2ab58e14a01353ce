use crate::domain::errors::ScenarioViolation;
use crate::domain::trading::trigger::TriggerKind;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Intended holding horizon for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentPeriod {
    Short,
    Mid,
    Long,
}

impl InvestmentPeriod {
    /// Calendar days after which a scenario is considered expired.
    pub fn expiry_days(&self) -> i64 {
        match self {
            InvestmentPeriod::Short => 7,
            InvestmentPeriod::Mid => 30,
            InvestmentPeriod::Long => 90,
        }
    }
}

impl fmt::Display for InvestmentPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestmentPeriod::Short => write!(f, "short"),
            InvestmentPeriod::Mid => write!(f, "mid"),
            InvestmentPeriod::Long => write!(f, "long"),
        }
    }
}

impl FromStr for InvestmentPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(InvestmentPeriod::Short),
            "mid" | "medium" => Ok(InvestmentPeriod::Mid),
            "long" => Ok(InvestmentPeriod::Long),
            _ => anyhow::bail!("Invalid investment period: {}", s),
        }
    }
}

/// The structured buy plan attached to a holding.
///
/// Produced by the buy agent and validated against the hard invariants
/// before any portfolio mutation:
/// `stop < entry < target`, stop distance within the trigger's maximum,
/// and risk/reward at or above the trigger's target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub entry_price: Decimal,
    pub target_price: Decimal,
    pub stop_loss_price: Decimal,
    pub investment_period: InvestmentPeriod,
    /// 0..=10 conviction score from the buy agent.
    pub buy_score: u8,
    pub rationale: String,
    #[serde(default)]
    pub key_levels: Vec<String>,
    #[serde(default)]
    pub sell_triggers: Vec<String>,
    #[serde(default)]
    pub hold_conditions: Vec<String>,
}

impl Scenario {
    /// (target - entry) / (entry - stop). Zero denominator yields 0.0.
    pub fn risk_reward(&self) -> f64 {
        let risk = self.entry_price - self.stop_loss_price;
        if risk <= Decimal::ZERO {
            return 0.0;
        }
        ((self.target_price - self.entry_price) / risk)
            .to_f64()
            .unwrap_or(0.0)
    }

    /// (entry - stop) / entry, as a fraction of entry.
    pub fn stop_distance(&self) -> f64 {
        if self.entry_price <= Decimal::ZERO {
            return 0.0;
        }
        ((self.entry_price - self.stop_loss_price) / self.entry_price)
            .to_f64()
            .unwrap_or(0.0)
    }

    pub fn validate(&self, trigger: TriggerKind) -> Result<(), ScenarioViolation> {
        if !(self.stop_loss_price < self.entry_price && self.entry_price < self.target_price) {
            return Err(ScenarioViolation::PriceOrdering {
                stop: self.stop_loss_price.to_string(),
                entry: self.entry_price.to_string(),
                target: self.target_price.to_string(),
            });
        }

        let sl_max = trigger.sl_max();
        let stop_distance = self.stop_distance();
        // Providers round stops to realm tick sizes; allow a hair of slack.
        if stop_distance > sl_max + 1e-6 {
            return Err(ScenarioViolation::StopTooWide {
                actual_pct: stop_distance * 100.0,
                max_pct: sl_max * 100.0,
            });
        }

        let rr = self.risk_reward();
        let rr_target = trigger.rr_target();
        if rr + 1e-9 < rr_target {
            return Err(ScenarioViolation::RiskRewardTooLow {
                actual: rr,
                target: rr_target,
            });
        }

        Ok(())
    }
}
