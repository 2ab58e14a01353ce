use crate::domain::market::ticker::Ticker;
use crate::domain::trading::scenario::Scenario;
use crate::domain::trading::trigger::{SessionMode, TriggerKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An open position. Created by a buy, mutated by price refreshes and
/// scenario adjustments, destroyed by a sell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: Ticker,
    pub name: String,
    pub sector: String,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
    pub quantity: Decimal,
    pub trigger: TriggerKind,
    pub session: SessionMode,
    pub scenario: Scenario,
    /// Prior scenarios, oldest first; grown on each adjustment.
    #[serde(default)]
    pub scenario_history: Vec<Scenario>,
    pub current_price: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl Holding {
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    pub fn profit_rate(&self) -> f64 {
        if self.buy_price <= Decimal::ZERO {
            return 0.0;
        }
        ((self.current_price - self.buy_price) / self.buy_price)
            .to_f64()
            .unwrap_or(0.0)
    }

    pub fn holding_days(&self, today: NaiveDate) -> i64 {
        (today - self.buy_date).num_days()
    }

    /// Replace the active scenario, preserving the old one in history.
    pub fn adjust_scenario(&mut self, new_scenario: Scenario) {
        let old = std::mem::replace(&mut self.scenario, new_scenario);
        self.scenario_history.push(old);
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellReason {
    StopLoss,
    TargetReached,
    ScenarioExpired,
    SellTrigger,
    AgentDecision,
}

impl fmt::Display for SellReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellReason::StopLoss => write!(f, "stop_loss"),
            SellReason::TargetReached => write!(f, "target_reached"),
            SellReason::ScenarioExpired => write!(f, "scenario_expired"),
            SellReason::SellTrigger => write!(f, "sell_trigger"),
            SellReason::AgentDecision => write!(f, "agent_decision"),
        }
    }
}

/// A closed round trip, persisted forever and journaled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub ticker: Ticker,
    pub name: String,
    pub sector: String,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
    pub sell_price: Decimal,
    pub sell_date: NaiveDate,
    pub quantity: Decimal,
    pub sell_reason: SellReason,
    /// Fractional return, e.g. 0.043 = +4.3%.
    pub profit_rate: f64,
    pub holding_days: i64,
    pub trigger: TriggerKind,
    pub session: SessionMode,
    pub scenario: Scenario,
}

impl Trade {
    pub fn from_close(holding: &Holding, sell_price: Decimal, sell_date: NaiveDate, reason: SellReason) -> Self {
        let profit_rate = if holding.buy_price > Decimal::ZERO {
            ((sell_price - holding.buy_price) / holding.buy_price)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ticker: holding.ticker.clone(),
            name: holding.name.clone(),
            sector: holding.sector.clone(),
            buy_price: holding.buy_price,
            buy_date: holding.buy_date,
            sell_price,
            sell_date,
            quantity: holding.quantity,
            sell_reason: reason,
            profit_rate,
            holding_days: (sell_date - holding.buy_date).num_days(),
            trigger: holding.trigger,
            session: holding.session,
            scenario: holding.scenario.clone(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.profit_rate > 0.0
    }
}

/// A ticker that was analyzed but not entered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub ticker: Ticker,
    pub analyzed_date: NaiveDate,
    pub buy_score: u8,
    pub decision: String,
    pub skip_reason: String,
    pub scenario: Option<Scenario>,
}

/// Event emitted towards the broker / messaging layers when the decision
/// layer commits to an entry or exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeSignal {
    Buy {
        ticker: Ticker,
        price: Decimal,
        quantity: Decimal,
        scenario: Scenario,
    },
    Sell {
        ticker: Ticker,
        price: Decimal,
        quantity: Decimal,
        reason: SellReason,
    },
    /// An order that could not be placed because the market was closed.
    Pending {
        ticker: Ticker,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::scenario::InvestmentPeriod;
    use rust_decimal_macros::dec;

    fn holding() -> Holding {
        Holding {
            ticker: Ticker::us("WMT"),
            name: "Walmart".to_string(),
            sector: "Retail".to_string(),
            buy_price: dec!(100),
            buy_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            quantity: dec!(10),
            trigger: TriggerKind::VolumeSurge,
            session: SessionMode::Morning,
            scenario: Scenario {
                entry_price: dec!(100),
                target_price: dec!(120),
                stop_loss_price: dec!(95),
                investment_period: InvestmentPeriod::Short,
                buy_score: 8,
                rationale: "test".to_string(),
                key_levels: vec![],
                sell_triggers: vec![],
                hold_conditions: vec![],
            },
            scenario_history: vec![],
            current_price: dec!(110),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_profit_rate_and_value() {
        let h = holding();
        assert!((h.profit_rate() - 0.10).abs() < 1e-9);
        assert_eq!(h.market_value(), dec!(1100));
    }

    #[test]
    fn test_trade_from_close() {
        let h = holding();
        let sell_date = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let trade = Trade::from_close(&h, dec!(108), sell_date, SellReason::TargetReached);
        assert!((trade.profit_rate - 0.08).abs() < 1e-9);
        assert_eq!(trade.holding_days, 7);
        assert!(trade.is_win());
    }

    #[test]
    fn test_adjust_scenario_preserves_history() {
        let mut h = holding();
        let mut new_scenario = h.scenario.clone();
        new_scenario.target_price = dec!(130);
        h.adjust_scenario(new_scenario);
        assert_eq!(h.scenario.target_price, dec!(130));
        assert_eq!(h.scenario_history.len(), 1);
        assert_eq!(h.scenario_history[0].target_price, dec!(120));
    }
}
