//! In-memory mock collaborators for tests.
//!
//! The mock LLM routes on the system prompt's role line, so scripted
//! behavior follows the agent rather than call order.

use crate::domain::errors::UpstreamError;
use crate::domain::market::candle::{CompanyMeta, DailyBar, HolderRow};
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::ports::{
    HeadlineSource, LlmProvider, LlmRequest, LlmResponse, MarketDataProvider, MessagingSink,
    ScoredHeadline, TokenUsage,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Which agent a request came from, inferred from its system prompt.
pub fn classify_request(request: &LlmRequest) -> &'static str {
    let s = &request.system;
    if s.contains("technical analyst") {
        "price_volume_analysis"
    } else if s.contains("ownership-structure analyst") {
        "institutional_holdings_analysis"
    } else if s.contains("fundamental analyst") {
        "company_status"
    } else if s.contains("industry analyst") {
        "company_overview"
    } else if s.contains("news and catalysts analyst") {
        "news_analysis"
    } else if s.contains("market strategist") {
        "market_index_analysis"
    } else if s.contains("lead strategist") {
        "strategy"
    } else if s.contains("condense an equity") {
        "optimizer"
    } else if s.contains("grade a broadcast") {
        "evaluator"
    } else if s.contains("Translate the given") {
        "translator"
    } else if s.contains("entry decision agent") {
        "buy"
    } else if s.contains("exit decision agent") {
        "sell"
    } else if s.contains("retrospective writer") {
        "journal"
    } else {
        "unknown"
    }
}

/// Scripted LLM: canned text per agent kind, optional transient-failure
/// budgets, call recording.
pub struct MockLlm {
    responses: Mutex<HashMap<String, String>>,
    fail_transient: Mutex<HashMap<String, u32>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockLlm {
    pub fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(
            "evaluator".to_string(),
            r#"{"rating": "excellent", "issues": []}"#.to_string(),
        );
        responses.insert(
            "sell".to_string(),
            r#"{"should_sell": false, "sell_reason": "", "confidence": 0.5, "adjustment": null}"#
                .to_string(),
        );
        responses.insert(
            "journal".to_string(),
            r#"{"situation_analysis": "entered on trigger", "judgment_evaluation": "plan followed",
                "lessons": ["respect the stop"], "pattern_tags": ["momentum"],
                "one_line_summary": "clean momentum trade", "confidence": 0.7, "principle": null}"#
                .to_string(),
        );
        Self {
            responses: Mutex::new(responses),
            fail_transient: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set the canned response for one agent kind.
    pub fn respond(&self, kind: &str, text: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(kind.to_string(), text.to_string());
    }

    /// Make the next `times` calls for `kind` fail with a transient error.
    pub fn fail_transiently(&self, kind: &str, times: u32) {
        self.fail_transient
            .lock()
            .unwrap()
            .insert(kind.to_string(), times);
    }

    pub fn calls_for(&self, kind: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == kind)
            .count()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, UpstreamError> {
        let kind = classify_request(&request);
        self.calls.lock().unwrap().push(kind.to_string());

        {
            let mut failures = self.fail_transient.lock().unwrap();
            if let Some(remaining) = failures.get_mut(kind)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(UpstreamError::Transient(format!("scripted 429 for {}", kind)));
            }
        }

        let text = self
            .responses
            .lock()
            .unwrap()
            .get(kind)
            .cloned()
            .unwrap_or_else(|| format!("mock {} analysis output", kind));

        Ok(LlmResponse {
            text,
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            },
        })
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

/// Static market data served from in-memory tables.
pub struct MockMarketData {
    pub realm: Realm,
    pub snapshots: HashMap<NaiveDate, HashMap<Ticker, Snapshot>>,
    pub bars: HashMap<Ticker, Vec<DailyBar>>,
    pub metas: HashMap<Ticker, CompanyMeta>,
    pub holders: HashMap<Ticker, Vec<HolderRow>>,
    pub index_bars: Vec<DailyBar>,
    pub quotes: Mutex<HashMap<Ticker, Decimal>>,
}

impl MockMarketData {
    pub fn new(realm: Realm) -> Self {
        Self {
            realm,
            snapshots: HashMap::new(),
            bars: HashMap::new(),
            metas: HashMap::new(),
            holders: HashMap::new(),
            index_bars: Vec::new(),
            quotes: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_quote(&self, ticker: &Ticker, price: Decimal) {
        self.quotes.lock().unwrap().insert(ticker.clone(), price);
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    fn realm(&self) -> Realm {
        self.realm
    }

    async fn snapshot(&self, day: NaiveDate) -> Result<HashMap<Ticker, Snapshot>, UpstreamError> {
        Ok(self.snapshots.get(&day).cloned().unwrap_or_default())
    }

    async fn ohlcv(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        Ok(self
            .bars
            .get(ticker)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start && b.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn company_meta(&self, ticker: &Ticker) -> Result<CompanyMeta, UpstreamError> {
        self.metas
            .get(ticker)
            .cloned()
            .ok_or_else(|| UpstreamError::UnknownTicker(ticker.to_string()))
    }

    async fn institutional_holders(
        &self,
        ticker: &Ticker,
    ) -> Result<Vec<HolderRow>, UpstreamError> {
        Ok(self.holders.get(ticker).cloned().unwrap_or_default())
    }

    async fn index_ohlcv(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, UpstreamError> {
        Ok(self
            .index_bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect())
    }

    async fn quote(&self, ticker: &Ticker) -> Result<Decimal, UpstreamError> {
        self.quotes
            .lock()
            .unwrap()
            .get(ticker)
            .copied()
            .ok_or_else(|| UpstreamError::UnknownTicker(ticker.to_string()))
    }
}

/// Headline source with a fixed list.
pub struct MockHeadlines {
    pub headlines: Vec<ScoredHeadline>,
}

impl MockHeadlines {
    pub fn empty() -> Self {
        Self { headlines: vec![] }
    }
}

#[async_trait]
impl HeadlineSource for MockHeadlines {
    async fn recent_headlines(
        &self,
        _query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredHeadline>, UpstreamError> {
        Ok(self.headlines.iter().take(limit).cloned().collect())
    }
}

/// Message-recording sink.
#[derive(Default)]
pub struct MockSink {
    pub messages: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MessagingSink for MockSink {
    async fn send_text(&self, channel: &str, message: &str) -> Result<(), UpstreamError> {
        self.messages
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }

    async fn send_document(&self, channel: &str, path: &Path) -> Result<(), UpstreamError> {
        self.messages
            .lock()
            .unwrap()
            .push((channel.to_string(), format!("document:{}", path.display())));
        Ok(())
    }
}
