//! Repository traits over the persistent store.
//!
//! The trading memory is the single writer; everything else consumes these
//! through its narrow query methods. Every table carries a market
//! discriminator so KR and US data never mix.

use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::memory::journal::{
    CompressionLayer, Intuition, JournalEntry, PerformanceRow, Principle,
};
use crate::domain::trading::trigger::TriggerKind;
use crate::domain::trading::types::{Holding, Trade, WatchlistEntry};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

#[async_trait]
pub trait HoldingRepository: Send + Sync {
    async fn save(&self, holding: &Holding) -> Result<()>;
    async fn delete(&self, ticker: &Ticker) -> Result<()>;
    async fn find_all(&self, realm: Realm) -> Result<Vec<Holding>>;
    async fn update_price(
        &self,
        ticker: &Ticker,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<()>;
}

#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn save(&self, trade: &Trade) -> Result<()>;
    async fn recent_for_ticker(&self, ticker: &Ticker, limit: usize) -> Result<Vec<Trade>>;
    async fn find_all(&self, realm: Realm) -> Result<Vec<Trade>>;
}

#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    async fn save(&self, entry: &WatchlistEntry) -> Result<()>;
    async fn recent(&self, realm: Realm, limit: usize) -> Result<Vec<WatchlistEntry>>;
}

#[async_trait]
pub trait JournalRepository: Send + Sync {
    /// Insert at layer 1; a journal for an already-journaled trade is a
    /// no-op (journals are append-only, one per trade per layer).
    async fn insert(&self, entry: &JournalEntry) -> Result<bool>;
    async fn find_by_layer(&self, realm: Realm, layer: CompressionLayer)
    -> Result<Vec<JournalEntry>>;
    async fn promote(
        &self,
        id: &str,
        layer: CompressionLayer,
        compressed_summary: Option<&str>,
    ) -> Result<()>;
    async fn delete_archived(
        &self,
        realm: Realm,
        layer: CompressionLayer,
        cutoff: DateTime<Utc>,
    ) -> Result<u64>;
    async fn recent_for_ticker(&self, ticker: &Ticker, limit: usize) -> Result<Vec<JournalEntry>>;
}

#[async_trait]
pub trait KnowledgeRepository: Send + Sync {
    /// Upsert by (market, condition, action); accumulates supporting
    /// trades and source journals on conflict.
    async fn upsert_principle(&self, realm: Realm, principle: &Principle) -> Result<()>;
    async fn active_principles(
        &self,
        realm: Realm,
        min_supporting: u32,
        limit: usize,
    ) -> Result<Vec<Principle>>;
    /// Upsert by (market, category, subcategory, condition), replacing the
    /// aggregate statistics.
    async fn upsert_intuition(&self, realm: Realm, intuition: &Intuition) -> Result<()>;
    async fn active_intuitions(
        &self,
        realm: Realm,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Intuition>>;
    /// Deactivate thin knowledge past its stale window. Returns rows
    /// touched.
    async fn deactivate_stale(
        &self,
        realm: Realm,
        min_supporting: u32,
        cutoff: DateTime<Utc>,
    ) -> Result<u64>;
    /// Keep only the strongest `max_active` rows active per kind.
    async fn cap_active(&self, realm: Realm, max_principles: usize, max_intuitions: usize)
    -> Result<u64>;
}

#[async_trait]
pub trait PerformanceTrackerRepository: Send + Sync {
    /// Insert a tracker row; duplicate (ticker, date, trigger) is a no-op.
    async fn insert(&self, row: &PerformanceRow) -> Result<bool>;
    async fn rows_for_trigger(&self, realm: Realm, trigger: TriggerKind)
    -> Result<Vec<PerformanceRow>>;
    /// Rows with at least one horizon old enough to fill but still empty.
    async fn pending_backfill(&self, realm: Realm, today: NaiveDate)
    -> Result<Vec<PerformanceRow>>;
    async fn fill_horizon(
        &self,
        ticker: &Ticker,
        analyzed_date: NaiveDate,
        trigger: TriggerKind,
        horizon_days: u32,
        price: Decimal,
    ) -> Result<()>;
}
