//! Performance-tracker backfill: fills 7/14/30-day prices as the horizons
//! elapse.

use crate::application::memory::TradingMemory;
use crate::domain::market::ticker::Realm;
use crate::domain::ports::MarketDataProvider;
use anyhow::Result;
use chrono::{Days, NaiveDate};
use tracing::{info, warn};

const HORIZONS: [u32; 3] = [7, 14, 30];

impl TradingMemory {
    /// Fill every elapsed-but-empty horizon price. Idempotent: filled
    /// horizons never re-fetch. Returns the number of cells written.
    pub async fn backfill_tracker(
        &self,
        provider: &dyn MarketDataProvider,
        realm: Realm,
        today: NaiveDate,
    ) -> Result<u64> {
        let pending = self.tracker.pending_backfill(realm, today).await?;
        if pending.is_empty() {
            return Ok(0);
        }
        info!("Tracker backfill ({realm}): {} rows pending", pending.len());

        let mut filled = 0;
        for row in pending {
            let bars = match provider
                .ohlcv(&row.ticker, row.analyzed_date, today)
                .await
            {
                Ok(bars) => bars,
                Err(e) => {
                    warn!("Backfill fetch failed for {}: {}", row.ticker, e);
                    continue;
                }
            };

            for (horizon, cell) in HORIZONS
                .iter()
                .zip([&row.price_7d, &row.price_14d, &row.price_30d])
            {
                if cell.is_some() {
                    continue;
                }
                let due = row.analyzed_date + Days::new(*horizon as u64);
                if due > today {
                    continue;
                }
                // First trading close at or after the horizon date
                let Some(bar) = bars.iter().find(|b| b.date >= due) else {
                    continue;
                };
                self.tracker
                    .fill_horizon(&row.ticker, row.analyzed_date, row.trigger, *horizon, bar.close)
                    .await?;
                filled += 1;
            }
        }

        info!("Tracker backfill ({realm}): {} cells filled", filled);
        Ok(filled)
    }
}
