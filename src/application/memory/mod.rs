//! The trading memory: single writer over the persistent store, plus the
//! context/adjustment service consumed by the decision layer.

pub mod compression;
pub mod context;
pub mod journal_writer;
pub mod tracker;

pub use compression::{CleanupReport, CompressionReport};

use crate::config::MemoryConfig;
use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::memory::journal::PerformanceRow;
use crate::domain::ports::LlmProvider;
use crate::domain::repositories::{
    HoldingRepository, JournalRepository, KnowledgeRepository, PerformanceTrackerRepository,
    TradeRepository, WatchlistRepository,
};
use crate::domain::trading::portfolio::Portfolio;
use crate::domain::trading::types::{Holding, SellReason, Trade, WatchlistEntry};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

pub struct TradingMemory {
    pub(crate) holdings: Arc<dyn HoldingRepository>,
    pub(crate) trades: Arc<dyn TradeRepository>,
    pub(crate) watchlist: Arc<dyn WatchlistRepository>,
    pub(crate) journals: Arc<dyn JournalRepository>,
    pub(crate) knowledge: Arc<dyn KnowledgeRepository>,
    pub(crate) tracker: Arc<dyn PerformanceTrackerRepository>,
    pub(crate) llm: Arc<dyn LlmProvider>,
    pub(crate) config: MemoryConfig,
}

impl TradingMemory {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        holdings: Arc<dyn HoldingRepository>,
        trades: Arc<dyn TradeRepository>,
        watchlist: Arc<dyn WatchlistRepository>,
        journals: Arc<dyn JournalRepository>,
        knowledge: Arc<dyn KnowledgeRepository>,
        tracker: Arc<dyn PerformanceTrackerRepository>,
        llm: Arc<dyn LlmProvider>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            holdings,
            trades,
            watchlist,
            journals,
            knowledge,
            tracker,
            llm,
            config,
        }
    }

    /// Load the current portfolio view for a realm.
    pub async fn portfolio(&self, realm: Realm, capital_base: Decimal) -> Result<Portfolio> {
        let holdings = self.holdings.find_all(realm).await?;
        Ok(Portfolio::new(holdings, capital_base))
    }

    /// Persist an admitted holding. Admission checks are the decision
    /// layer's job and must have passed before this is called.
    pub async fn create_holding(&self, holding: &Holding) -> Result<()> {
        self.holdings.save(holding).await?;
        info!(
            "Holding created: {} x{} @ {}",
            holding.ticker, holding.quantity, holding.buy_price
        );
        Ok(())
    }

    pub async fn refresh_price(&self, ticker: &Ticker, price: Decimal) -> Result<()> {
        self.holdings.update_price(ticker, price, Utc::now()).await
    }

    /// Persist a scenario adjustment (the holding carries its history).
    pub async fn update_holding(&self, holding: &Holding) -> Result<()> {
        self.holdings.save(holding).await
    }

    /// Close a position: append the trade, drop the holding, write the
    /// retrospective journal. The sell is durable even when the journal
    /// agent fails.
    pub async fn close_trade(
        &self,
        holding: &Holding,
        sell_price: Decimal,
        sell_date: NaiveDate,
        reason: SellReason,
        buy_context: &str,
        sell_context: &str,
    ) -> Result<Trade> {
        let trade = Trade::from_close(holding, sell_price, sell_date, reason);
        self.trades.save(&trade).await?;
        self.holdings.delete(&holding.ticker).await?;
        info!(
            "Trade closed: {} {} {:+.2}% over {} days",
            trade.ticker,
            trade.sell_reason,
            trade.profit_rate * 100.0,
            trade.holding_days
        );

        self.write_journal(&trade, buy_context, sell_context).await?;
        Ok(trade)
    }

    pub async fn record_watchlist(&self, entry: &WatchlistEntry) -> Result<()> {
        self.watchlist.save(entry).await
    }

    pub async fn recent_watchlist(
        &self,
        realm: Realm,
        limit: usize,
    ) -> Result<Vec<WatchlistEntry>> {
        self.watchlist.recent(realm, limit).await
    }

    /// Record an analyzed ticker in the performance tracker; duplicates
    /// for the same (ticker, date, trigger) are ignored.
    pub async fn track_analysis(&self, row: &PerformanceRow) -> Result<bool> {
        self.tracker.insert(row).await
    }

    pub async fn recent_trades(&self, ticker: &Ticker, limit: usize) -> Result<Vec<Trade>> {
        self.trades.recent_for_ticker(ticker, limit).await
    }

    pub async fn journals_for_ticker(
        &self,
        ticker: &Ticker,
        limit: usize,
    ) -> Result<Vec<crate::domain::memory::journal::JournalEntry>> {
        self.journals.recent_for_ticker(ticker, limit).await
    }
}
