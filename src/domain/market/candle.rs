use crate::domain::market::ticker::Ticker;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
}

/// Company reference data as reported by the realm's provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyMeta {
    pub ticker: Ticker,
    pub name: String,
    pub sector: String,
    pub industry: String,
    pub market_cap: Decimal,
    pub listing_exchange: String,
}

/// One institutional holder row, ordered by stake size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolderRow {
    pub holder: String,
    pub pct_held: f64,
    pub shares: u64,
}
