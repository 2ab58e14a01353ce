use crate::domain::market::ticker::Ticker;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// End-of-day (or intraday-so-far) state of one instrument on one trading day.
///
/// A snapshot row is always complete: providers omit a ticker entirely rather
/// than returning a partial row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub ticker: Ticker,
    pub trading_day: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub prev_close: Decimal,
    pub volume: u64,
    /// Total value traded during the day, in realm currency.
    pub traded_value: Decimal,
    pub market_cap: Decimal,
}

impl Snapshot {
    /// Close-to-close change, as a fraction (0.03 = +3%).
    pub fn change_rate(&self) -> f64 {
        ratio(self.close - self.prev_close, self.prev_close)
    }

    /// Open vs previous close, as a fraction.
    pub fn gap_rate(&self) -> f64 {
        ratio(self.open - self.prev_close, self.prev_close)
    }

    /// Close vs open, as a fraction.
    pub fn intraday_rate(&self) -> f64 {
        ratio(self.close - self.open, self.open)
    }

    /// Traded value relative to market cap.
    pub fn value_to_cap_ratio(&self) -> f64 {
        ratio(self.traded_value, self.market_cap)
    }

    /// Where the close sits inside the day's range: 1.0 = closed at the high,
    /// 0.0 = closed at the low. A flat bar (high == low) yields 0.0.
    pub fn closing_strength(&self) -> f64 {
        let range = self.high - self.low;
        if range <= Decimal::ZERO {
            return 0.0;
        }
        ratio(self.close - self.low, range)
    }

    pub fn is_up_day(&self) -> bool {
        self.close > self.open
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> f64 {
    if denominator == Decimal::ZERO {
        return 0.0;
    }
    (numerator / denominator).to_f64().unwrap_or(0.0)
}
