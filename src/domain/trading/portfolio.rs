use crate::domain::errors::PortfolioViolation;
use crate::domain::market::ticker::Ticker;
use crate::domain::trading::types::Holding;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Hard caps enforced before any holding is persisted.
pub const MAX_HOLDINGS: usize = 10;
pub const MAX_PER_SECTOR: usize = 3;
pub const MAX_SECTOR_WEIGHT: f64 = 0.30;

/// In-memory view of the simulated portfolio.
///
/// `capital_base` is the total capital the book is sized against (invested
/// value plus uncommitted cash); sector weights are measured against it.
/// Admission checks run against this view before any database write, so a
/// rejected buy never leaves a partial row behind.
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub capital_base: Decimal,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>, capital_base: Decimal) -> Self {
        Self {
            holdings,
            capital_base,
        }
    }

    pub fn is_full(&self) -> bool {
        self.holdings.len() >= MAX_HOLDINGS
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.holdings.iter().any(|h| &h.ticker == ticker)
    }

    pub fn get(&self, ticker: &Ticker) -> Option<&Holding> {
        self.holdings.iter().find(|h| &h.ticker == ticker)
    }

    pub fn sector_count(&self, sector: &str) -> usize {
        self.holdings.iter().filter(|h| h.sector == sector).count()
    }

    pub fn invested_value(&self) -> Decimal {
        self.holdings.iter().map(|h| h.market_value()).sum()
    }

    pub fn sector_value(&self, sector: &str) -> Decimal {
        self.holdings
            .iter()
            .filter(|h| h.sector == sector)
            .map(|h| h.market_value())
            .sum()
    }

    /// Check whether a new position of `planned_value` in `sector` would
    /// break any invariant. Returns the first violation found; checks run
    /// cheapest-first.
    pub fn check_admission(
        &self,
        ticker: &Ticker,
        sector: &str,
        planned_value: Decimal,
    ) -> Result<(), PortfolioViolation> {
        if self.is_full() {
            return Err(PortfolioViolation::SlotCap {
                current: self.holdings.len(),
                max: MAX_HOLDINGS,
            });
        }

        if self.contains(ticker) {
            return Err(PortfolioViolation::Duplicate {
                ticker: ticker.to_string(),
            });
        }

        let sector_count = self.sector_count(sector);
        if sector_count >= MAX_PER_SECTOR {
            return Err(PortfolioViolation::SectorCount {
                sector: sector.to_string(),
                current: sector_count,
                max: MAX_PER_SECTOR,
            });
        }

        // Weight against the capital base, falling back to invested value
        // when no base is configured.
        let base = if self.capital_base > Decimal::ZERO {
            self.capital_base
        } else {
            self.invested_value() + planned_value
        };
        if base > Decimal::ZERO {
            let sector_after = self.sector_value(sector) + planned_value;
            let weight = (sector_after / base).to_f64().unwrap_or(0.0);
            if weight > MAX_SECTOR_WEIGHT + 1e-9 {
                return Err(PortfolioViolation::SectorWeight {
                    sector: sector.to_string(),
                    would_be_pct: weight * 100.0,
                    max_pct: MAX_SECTOR_WEIGHT * 100.0,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trading::scenario::{InvestmentPeriod, Scenario};
    use crate::domain::trading::trigger::{SessionMode, TriggerKind};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn holding(code: &str, sector: &str, value: Decimal) -> Holding {
        Holding {
            ticker: Ticker::us(code),
            name: code.to_string(),
            sector: sector.to_string(),
            buy_price: value,
            buy_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            quantity: dec!(1),
            trigger: TriggerKind::VolumeSurge,
            session: SessionMode::Morning,
            scenario: Scenario {
                entry_price: value,
                target_price: value * dec!(1.2),
                stop_loss_price: value * dec!(0.95),
                investment_period: InvestmentPeriod::Short,
                buy_score: 7,
                rationale: String::new(),
                key_levels: vec![],
                sell_triggers: vec![],
                hold_conditions: vec![],
            },
            scenario_history: vec![],
            current_price: value,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn test_slot_cap() {
        let holdings: Vec<Holding> = (0..10)
            .map(|i| holding(&format!("T{}", i), &format!("S{}", i), dec!(100)))
            .collect();
        let p = Portfolio::new(holdings, dec!(2000));
        assert!(p.is_full());
        assert!(matches!(
            p.check_admission(&Ticker::us("NEW"), "Other", dec!(100)),
            Err(PortfolioViolation::SlotCap {
                current: 10,
                max: 10
            })
        ));
    }

    #[test]
    fn test_duplicate_refused() {
        let p = Portfolio::new(vec![holding("WMT", "Retail", dec!(100))], dec!(1000));
        assert!(matches!(
            p.check_admission(&Ticker::us("WMT"), "Retail", dec!(100)),
            Err(PortfolioViolation::Duplicate { .. })
        ));
    }

    #[test]
    fn test_sector_count_cap() {
        let p = Portfolio::new(
            vec![
                holding("NVDA", "Semiconductors", dec!(100)),
                holding("AMD", "Semiconductors", dec!(100)),
                holding("AVGO", "Semiconductors", dec!(100)),
                holding("WMT", "Retail", dec!(100)),
            ],
            dec!(2000),
        );
        assert!(matches!(
            p.check_admission(&Ticker::us("MU"), "Semiconductors", dec!(100)),
            Err(PortfolioViolation::SectorCount {
                current: 3,
                max: 3,
                ..
            })
        ));
        // A different sector is still admissible
        assert!(
            p.check_admission(&Ticker::us("XOM"), "Energy", dec!(100))
                .is_ok()
        );
    }

    #[test]
    fn test_sector_weight_cap() {
        // Base 1000: two Tech holdings of 100 each, adding another 150 puts
        // Tech at 350/1000 = 35% > 30%.
        let p = Portfolio::new(
            vec![
                holding("A", "Tech", dec!(100)),
                holding("B", "Tech", dec!(100)),
            ],
            dec!(1000),
        );
        assert!(matches!(
            p.check_admission(&Ticker::us("C"), "Tech", dec!(150)),
            Err(PortfolioViolation::SectorWeight { .. })
        ));
        // 100 more keeps Tech at exactly 30%
        assert!(
            p.check_admission(&Ticker::us("C"), "Tech", dec!(100))
                .is_ok()
        );
    }

    #[test]
    fn test_first_position_admitted() {
        let p = Portfolio::new(vec![], dec!(1000));
        assert!(
            p.check_admission(&Ticker::us("WMT"), "Retail", dec!(100))
                .is_ok()
        );
    }
}
