use crate::domain::market::candle::DailyBar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse market state consumed by the decision gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    Bull,
    Bear,
    Sideways,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Bull => write!(f, "bull"),
            Regime::Bear => write!(f, "bear"),
            Regime::Sideways => write!(f, "sideways"),
        }
    }
}

/// Classifies the market regime from index daily bars.
///
/// The rule is deliberately coarse: the index close relative to its short
/// and long moving averages, plus the short average's slope. Anything
/// without a clear directional reading falls back to `Sideways`.
pub struct RegimeDetector {
    short_window: usize,
    long_window: usize,
    slope_threshold: f64,
}

impl RegimeDetector {
    pub fn new(short_window: usize, long_window: usize, slope_threshold: f64) -> Self {
        Self {
            short_window,
            long_window,
            slope_threshold,
        }
    }

    pub fn detect(&self, bars: &[DailyBar]) -> Regime {
        if bars.len() < self.long_window.max(self.short_window * 2) {
            return Regime::Sideways;
        }

        let closes: Vec<f64> = bars.iter().map(|b| decimal_to_f64(b.close)).collect();

        let short = mean(&closes[closes.len() - self.short_window..]);
        let long = mean(&closes[closes.len() - self.long_window..]);
        let last = closes[closes.len() - 1];

        // Slope of the short average over the last short_window days
        let prev_short = mean(
            &closes[closes.len() - self.short_window * 2..closes.len() - self.short_window],
        );
        let slope = if prev_short > 0.0 {
            (short - prev_short) / prev_short
        } else {
            0.0
        };

        if last > short && short > long && slope > self.slope_threshold {
            Regime::Bull
        } else if last < short && short < long && slope < -self.slope_threshold {
            Regime::Bear
        } else {
            Regime::Sideways
        }
    }
}

impl Default for RegimeDetector {
    fn default() -> Self {
        // SMA-20 vs SMA-60 with a 0.5% slope band
        Self::new(20, 60, 0.005)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn decimal_to_f64(d: Decimal) -> f64 {
    use rust_decimal::prelude::ToPrimitive;
    d.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::prelude::FromPrimitive;

    fn bars_from_closes(closes: &[f64]) -> Vec<DailyBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| DailyBar {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: Decimal::from_f64(c).unwrap(),
                high: Decimal::from_f64(c + 1.0).unwrap(),
                low: Decimal::from_f64(c - 1.0).unwrap(),
                close: Decimal::from_f64(c).unwrap(),
                volume: 1_000_000,
            })
            .collect()
    }

    #[test]
    fn test_steady_uptrend_is_bull() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let regime = RegimeDetector::default().detect(&bars_from_closes(&closes));
        assert_eq!(regime, Regime::Bull);
    }

    #[test]
    fn test_steady_downtrend_is_bear() {
        let closes: Vec<f64> = (0..80).map(|i| 200.0 - i as f64).collect();
        let regime = RegimeDetector::default().detect(&bars_from_closes(&closes));
        assert_eq!(regime, Regime::Bear);
    }

    #[test]
    fn test_flat_market_is_sideways() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let regime = RegimeDetector::default().detect(&bars_from_closes(&closes));
        assert_eq!(regime, Regime::Sideways);
    }

    #[test]
    fn test_short_history_is_sideways() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let regime = RegimeDetector::default().detect(&bars_from_closes(&closes));
        assert_eq!(regime, Regime::Sideways);
    }
}
