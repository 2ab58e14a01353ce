//! Screener thresholds. Absolute filters are realm parameters; the scoring
//! weights themselves are fixed by the trigger definitions.

use crate::domain::market::ticker::Realm;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    /// Minimum traded value per realm (KRW / USD).
    pub min_traded_value_kr: Decimal,
    pub min_traded_value_us: Decimal,
    /// Minimum market cap per realm.
    pub min_market_cap_kr: Decimal,
    pub min_market_cap_us: Decimal,
    /// |change_rate| beyond this is discarded as broken data or a halt-bound
    /// spike.
    pub max_abs_change_rate: f64,
    /// Volume floor relative to the market mean.
    pub min_volume_vs_mean: f64,
    /// Bottom volume share dropped by the liquidity tail cut.
    pub liquidity_tail_pct: f64,
    /// Candidates per trigger carried into the agent-fit pass.
    pub agent_fit_depth: usize,
    /// OHLCV lookback for the agent-fit target estimate, days.
    pub fit_window_days: i64,
    /// Target price floor as a multiple of the current price.
    pub target_floor_ratio: Decimal,
    /// Final shortlist size.
    pub max_selected: usize,
}

impl ScreenerConfig {
    pub fn from_env() -> Self {
        Self {
            min_traded_value_kr: parse_decimal("SCREEN_MIN_VALUE_KR", dec!(10_000_000_000)),
            min_traded_value_us: parse_decimal("SCREEN_MIN_VALUE_US", dec!(100_000_000)),
            min_market_cap_kr: parse_decimal("SCREEN_MIN_CAP_KR", dec!(500_000_000_000)),
            min_market_cap_us: parse_decimal("SCREEN_MIN_CAP_US", dec!(5_000_000_000)),
            max_abs_change_rate: 0.20,
            min_volume_vs_mean: 0.2,
            liquidity_tail_pct: 0.20,
            agent_fit_depth: 10,
            fit_window_days: 10,
            target_floor_ratio: dec!(1.15),
            max_selected: 3,
        }
    }

    pub fn min_traded_value(&self, realm: Realm) -> Decimal {
        match realm {
            Realm::Kr => self.min_traded_value_kr,
            Realm::Us => self.min_traded_value_us,
        }
    }

    pub fn min_market_cap(&self, realm: Realm) -> Decimal {
        match realm {
            Realm::Kr => self.min_market_cap_kr,
            Realm::Us => self.min_market_cap_us,
        }
    }
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(default)
}
