//! Session-scoped shared state.
//!
//! One `SessionContext` lives for exactly one session run. It owns the
//! snapshot cache and the market-index analysis cache; both are read-only
//! after first fill and die with the session (`init → use → dispose`).

use crate::domain::errors::UpstreamError;
use crate::domain::market::regime::Regime;
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::ports::{MarketDataProvider, TokenUsage};
use crate::domain::trading::trigger::SessionMode;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// The market-index analysis computed once per session and reused for
/// every ticker of that session and realm.
#[derive(Debug, Clone)]
pub struct MarketOverview {
    pub regime: Regime,
    /// Narrative produced by the market-index agent; a placeholder when
    /// the agent degraded.
    pub narrative: String,
    pub degraded: bool,
    pub usage: TokenUsage,
}

pub struct SessionContext {
    pub realm: Realm,
    pub mode: SessionMode,
    pub trading_day: NaiveDate,
    snapshots: RwLock<HashMap<NaiveDate, Arc<HashMap<Ticker, Snapshot>>>>,
    market_overview: RwLock<Option<Arc<MarketOverview>>>,
}

impl SessionContext {
    pub fn new(realm: Realm, mode: SessionMode, trading_day: NaiveDate) -> Self {
        Self {
            realm,
            mode,
            trading_day,
            snapshots: RwLock::new(HashMap::new()),
            market_overview: RwLock::new(None),
        }
    }

    /// Fetch a day's snapshot through the cache. Repeated calls for the
    /// same day never hit the upstream again within this session.
    pub async fn snapshot(
        &self,
        provider: &dyn MarketDataProvider,
        day: NaiveDate,
    ) -> Result<Arc<HashMap<Ticker, Snapshot>>, UpstreamError> {
        if let Some(cached) = self.snapshots.read().await.get(&day) {
            debug!("Snapshot cache hit for {} {}", self.realm, day);
            return Ok(cached.clone());
        }

        let fresh = Arc::new(provider.snapshot(day).await?);
        let mut cache = self.snapshots.write().await;
        // A concurrent fill could have won the race; first write wins so
        // callers always observe identical objects.
        let entry = cache.entry(day).or_insert_with(|| fresh.clone());
        Ok(entry.clone())
    }

    pub async fn market_overview(&self) -> Option<Arc<MarketOverview>> {
        self.market_overview.read().await.clone()
    }

    /// First fill wins; later calls return the already-cached overview.
    pub async fn fill_market_overview(&self, overview: MarketOverview) -> Arc<MarketOverview> {
        let mut slot = self.market_overview.write().await;
        match &*slot {
            Some(existing) => existing.clone(),
            None => {
                let arc = Arc::new(overview);
                *slot = Some(arc.clone());
                arc
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::candle::{CompanyMeta, DailyBar, HolderRow};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        fn realm(&self) -> Realm {
            Realm::Us
        }

        async fn snapshot(
            &self,
            _day: NaiveDate,
        ) -> Result<HashMap<Ticker, Snapshot>, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HashMap::new())
        }

        async fn ohlcv(
            &self,
            _ticker: &Ticker,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DailyBar>, UpstreamError> {
            Ok(vec![])
        }

        async fn company_meta(&self, ticker: &Ticker) -> Result<CompanyMeta, UpstreamError> {
            Err(UpstreamError::UnknownTicker(ticker.to_string()))
        }

        async fn institutional_holders(
            &self,
            _ticker: &Ticker,
        ) -> Result<Vec<HolderRow>, UpstreamError> {
            Ok(vec![])
        }

        async fn index_ohlcv(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<DailyBar>, UpstreamError> {
            Ok(vec![])
        }

        async fn quote(&self, _ticker: &Ticker) -> Result<Decimal, UpstreamError> {
            Ok(Decimal::ZERO)
        }
    }

    #[tokio::test]
    async fn test_snapshot_cached_per_day() {
        let provider = CountingProvider {
            calls: AtomicU32::new(0),
        };
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let ctx = SessionContext::new(Realm::Us, SessionMode::Morning, day);

        let a = ctx.snapshot(&provider, day).await.unwrap();
        let b = ctx.snapshot(&provider, day).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // A different day is a separate cache entry
        ctx.snapshot(&provider, day - chrono::Days::new(1))
            .await
            .unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_market_overview_first_fill_wins() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let ctx = SessionContext::new(Realm::Us, SessionMode::Morning, day);
        assert!(ctx.market_overview().await.is_none());

        let first = ctx
            .fill_market_overview(MarketOverview {
                regime: Regime::Bull,
                narrative: "first".to_string(),
                degraded: false,
                usage: TokenUsage::default(),
            })
            .await;
        let second = ctx
            .fill_market_overview(MarketOverview {
                regime: Regime::Bear,
                narrative: "second".to_string(),
                degraded: false,
                usage: TokenUsage::default(),
            })
            .await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(ctx.market_overview().await.unwrap().narrative, "first");
    }
}
