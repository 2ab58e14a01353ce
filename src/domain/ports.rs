use crate::domain::errors::UpstreamError;
use crate::domain::market::candle::{CompanyMeta, DailyBar, HolderRow};
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::{Realm, Ticker};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::AddAssign;
use std::path::Path;

/// Read-only market access for one realm. All methods are idempotent and
/// side-effect-free; a missing ticker is an absent key, never a partial row.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn realm(&self) -> Realm;

    /// Full-universe snapshot for a trading day, pre-filtered to the
    /// realm's minimum liquidity floor.
    async fn snapshot(&self, day: NaiveDate) -> Result<HashMap<Ticker, Snapshot>, UpstreamError>;

    /// Ordered daily bars; empty when the ticker is unknown or the range
    /// falls outside its listing.
    async fn ohlcv(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError>;

    async fn company_meta(&self, ticker: &Ticker) -> Result<CompanyMeta, UpstreamError>;

    async fn institutional_holders(&self, ticker: &Ticker)
    -> Result<Vec<HolderRow>, UpstreamError>;

    /// Daily bars for the realm's headline index (KOSPI / S&P 500),
    /// consumed by regime detection and the market-index analysis.
    async fn index_ohlcv(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError>;

    /// Latest tradable price, used by the sell sweep's refresh step.
    async fn quote(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError>;
}

/// One LLM request. Agents fill `system` with their role prompt and `user`
/// with the assembled inputs.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.4,
            max_tokens: 4096,
        }
    }
}

/// Opaque token accounting surfaced so the orchestrator can log cost.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// Narrow LLM access. Providers map HTTP-level failures onto the
/// transient/permanent classification; retry policy lives with the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, UpstreamError>;

    fn model(&self) -> &str;
}

/// Outbound broadcast channel. Failures are non-fatal to the session; the
/// orchestrator logs them and carries on.
#[async_trait]
pub trait MessagingSink: Send + Sync {
    async fn send_text(&self, channel: &str, message: &str) -> Result<(), UpstreamError>;

    async fn send_document(&self, channel: &str, path: &Path) -> Result<(), UpstreamError>;
}

/// A news headline scored by the local sentiment analyzer, fed to the
/// news-analysis agent as grounding material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHeadline {
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    /// -1.0 (bearish) .. 1.0 (bullish).
    pub sentiment: f64,
}

#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn recent_headlines(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredHeadline>, UpstreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeMode {
    Demo,
    Real,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFill {
    pub success: bool,
    pub fill_price: Decimal,
    pub quantity: Decimal,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerPosition {
    pub ticker: Ticker,
    pub quantity: Decimal,
    pub avg_price: Decimal,
    pub value: Decimal,
}

/// Order placement for real/demo trading. Market-hours gating is the
/// adapter's job; out-of-hours surfaces as `UpstreamError::MarketClosed`,
/// which the decision layer converts into a pending signal.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn quote(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError>;

    async fn buy(
        &self,
        ticker: &Ticker,
        amount: Decimal,
        mode: TradeMode,
    ) -> Result<OrderFill, UpstreamError>;

    async fn sell(
        &self,
        ticker: &Ticker,
        quantity: Decimal,
        mode: TradeMode,
    ) -> Result<OrderFill, UpstreamError>;

    async fn portfolio(&self) -> Result<Vec<BrokerPosition>, UpstreamError>;
}
