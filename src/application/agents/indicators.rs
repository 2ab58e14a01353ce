//! Technical indicator digest handed to the price/volume analysis agent.

use crate::domain::market::candle::DailyBar;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
    SimpleMovingAverage,
};

/// Latest indicator readings over a daily-bar window. Fields are `None`
/// when the window is too short for the indicator to season.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorSummary {
    pub last_close: f64,
    pub sma_20: Option<f64>,
    pub sma_60: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    /// Average daily volume over the window.
    pub avg_volume: f64,
}

pub fn compute(bars: &[DailyBar]) -> IndicatorSummary {
    let closes: Vec<f64> = bars
        .iter()
        .map(|b| b.close.to_f64().unwrap_or(0.0))
        .collect();
    if closes.is_empty() {
        return IndicatorSummary::default();
    }

    let mut summary = IndicatorSummary {
        last_close: closes[closes.len() - 1],
        avg_volume: bars.iter().map(|b| b.volume as f64).sum::<f64>() / bars.len() as f64,
        ..Default::default()
    };

    // Periods are fixed valid constants; constructors cannot fail on them.
    if closes.len() >= 20 {
        summary.sma_20 = run_through(SimpleMovingAverage::new(20).unwrap(), &closes);
    }
    if closes.len() >= 60 {
        summary.sma_60 = run_through(SimpleMovingAverage::new(60).unwrap(), &closes);
    }
    if closes.len() >= 15 {
        summary.rsi_14 = run_through(RelativeStrengthIndex::new(14).unwrap(), &closes);
    }

    if closes.len() >= 26 {
        let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).unwrap();
        let mut out = None;
        for c in &closes {
            out = Some(macd.next(*c));
        }
        if let Some(out) = out {
            summary.macd = Some(out.macd);
            summary.macd_signal = Some(out.signal);
            summary.macd_histogram = Some(out.histogram);
        }
    }

    if closes.len() >= 20 {
        let mut bb = BollingerBands::new(20, 2.0).unwrap();
        let mut out = None;
        for c in &closes {
            out = Some(bb.next(*c));
        }
        if let Some(out) = out {
            summary.bb_upper = Some(out.upper);
            summary.bb_middle = Some(out.average);
            summary.bb_lower = Some(out.lower);
        }
    }

    summary
}

fn run_through<I: Next<f64, Output = f64>>(mut indicator: I, closes: &[f64]) -> Option<f64> {
    let mut last = None;
    for c in closes {
        last = Some(indicator.next(*c));
    }
    last
}

/// Render the digest as the compact text block the prompt embeds.
pub fn render(summary: &IndicatorSummary) -> String {
    let fmt_opt = |v: Option<f64>| match v {
        Some(x) => format!("{:.2}", x),
        None => "n/a".to_string(),
    };
    format!(
        "close={:.2} sma20={} sma60={} rsi14={} macd={}/{}/{} bollinger={}..{}..{} avg_volume={:.0}",
        summary.last_close,
        fmt_opt(summary.sma_20),
        fmt_opt(summary.sma_60),
        fmt_opt(summary.rsi_14),
        fmt_opt(summary.macd),
        fmt_opt(summary.macd_signal),
        fmt_opt(summary.macd_histogram),
        fmt_opt(summary.bb_lower),
        fmt_opt(summary.bb_middle),
        fmt_opt(summary.bb_upper),
        summary.avg_volume,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal::prelude::FromPrimitive;

    fn bars(n: usize) -> Vec<DailyBar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.5;
                DailyBar {
                    date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                        + chrono::Days::new(i as u64),
                    open: Decimal::from_f64(c - 0.2).unwrap(),
                    high: Decimal::from_f64(c + 0.5).unwrap(),
                    low: Decimal::from_f64(c - 0.5).unwrap(),
                    close: Decimal::from_f64(c).unwrap(),
                    volume: 1_000_000,
                }
            })
            .collect()
    }

    #[test]
    fn test_short_window_yields_nones() {
        let summary = compute(&bars(5));
        assert!(summary.sma_20.is_none());
        assert!(summary.rsi_14.is_none());
        assert!(summary.last_close > 0.0);
    }

    #[test]
    fn test_full_window_fills_indicators() {
        let summary = compute(&bars(80));
        assert!(summary.sma_20.is_some());
        assert!(summary.sma_60.is_some());
        assert!(summary.rsi_14.is_some());
        assert!(summary.macd.is_some());
        assert!(summary.bb_middle.is_some());
        // Steady uptrend: short average above long, RSI elevated
        assert!(summary.sma_20.unwrap() > summary.sma_60.unwrap());
        assert!(summary.rsi_14.unwrap() > 50.0);
    }

    #[test]
    fn test_empty_input() {
        let summary = compute(&[]);
        assert_eq!(summary.last_close, 0.0);
        assert!(summary.sma_20.is_none());
    }

    #[test]
    fn test_render_mentions_missing_values() {
        let text = render(&compute(&bars(5)));
        assert!(text.contains("n/a"));
    }
}
