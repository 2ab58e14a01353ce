//! The per-ticker analytical workflow: six specialist section agents, a
//! strategy synthesis step, and a summary optimizer/evaluator loop.
//!
//! Agents are stateless; dispatch goes through an explicit registry mapping
//! each section to its agent rather than any name-based lookup.

pub mod indicators;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod schema;
pub mod sections;
pub mod summary;
pub mod translator;

pub use pipeline::ReportPipeline;
pub use report::TickerReport;
pub use sections::{AnalysisSection, SectionOutput};

use crate::application::agents::indicators::IndicatorSummary;
use crate::domain::errors::UpstreamError;
use crate::domain::market::candle::{CompanyMeta, DailyBar, HolderRow};
use crate::domain::market::regime::Regime;
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::Ticker;
use crate::domain::ports::{LlmProvider, LlmRequest, LlmResponse, ScoredHeadline};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

/// Everything gathered up front for one ticker's report. Sections read
/// from this bundle; nothing is fetched mid-pipeline.
#[derive(Debug, Clone)]
pub struct TickerBundle {
    pub ticker: Ticker,
    pub meta: CompanyMeta,
    pub reference_date: NaiveDate,
    pub snapshot_row: Option<Snapshot>,
    pub bars: Vec<DailyBar>,
    pub indicators: IndicatorSummary,
    pub holders: Vec<HolderRow>,
    pub headlines: Vec<ScoredHeadline>,
    pub index_bars: Vec<DailyBar>,
    pub regime: Regime,
}

impl TickerBundle {
    fn bars_block(&self, limit: usize) -> String {
        let skip = self.bars.len().saturating_sub(limit);
        self.bars
            .iter()
            .skip(skip)
            .map(|b| {
                format!(
                    "{} o={} h={} l={} c={} v={}",
                    b.date, b.open, b.high, b.low, b.close, b.volume
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn holders_block(&self) -> String {
        if self.holders.is_empty() {
            return "(no institutional holder data)".to_string();
        }
        self.holders
            .iter()
            .map(|h| format!("{}: {:.2}% ({} shares)", h.holder, h.pct_held, h.shares))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn headlines_block(&self) -> String {
        if self.headlines.is_empty() {
            return "(no recent headlines retrieved)".to_string();
        }
        self.headlines
            .iter()
            .map(|h| {
                format!(
                    "[{}] ({:+.2}) {}",
                    h.published_at.date_naive(),
                    h.sentiment,
                    h.title
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn meta_block(&self) -> String {
        format!(
            "ticker={} name={} sector={} industry={} market_cap={} exchange={}",
            self.ticker,
            self.meta.name,
            self.meta.sector,
            self.meta.industry,
            self.meta.market_cap,
            self.meta.listing_exchange
        )
    }
}

/// One analytical section agent. Variants are enumerated below; there is
/// no open-ended registration.
#[async_trait]
pub trait SectionAgent: Send + Sync {
    fn section(&self) -> AnalysisSection;

    fn build_request(&self, bundle: &TickerBundle, language: &str) -> LlmRequest;

    async fn invoke(
        &self,
        bundle: &TickerBundle,
        language: &str,
        llm: &dyn LlmProvider,
    ) -> Result<LlmResponse, UpstreamError> {
        llm.complete(self.build_request(bundle, language)).await
    }
}

macro_rules! section_agent {
    ($name:ident, $section:expr, $payload:expr) => {
        pub struct $name;

        #[async_trait]
        impl SectionAgent for $name {
            fn section(&self) -> AnalysisSection {
                $section
            }

            fn build_request(&self, bundle: &TickerBundle, language: &str) -> LlmRequest {
                let payload: fn(&TickerBundle) -> String = $payload;
                LlmRequest::new(
                    prompts::section_system_prompt($section, language),
                    format!("Reference date: {}\n{}", bundle.reference_date, payload(bundle)),
                )
            }
        }
    };
}

section_agent!(PriceVolumeAgent, AnalysisSection::PriceVolume, |b| {
    format!(
        "{}\n\nIndicator digest:\n{}\n\nDaily bars (most recent last):\n{}",
        b.meta_block(),
        indicators::render(&b.indicators),
        b.bars_block(30)
    )
});

section_agent!(HoldingsAgent, AnalysisSection::InstitutionalHoldings, |b| {
    format!(
        "{}\n\nInstitutional holders:\n{}",
        b.meta_block(),
        b.holders_block()
    )
});

section_agent!(CompanyStatusAgent, AnalysisSection::CompanyStatus, |b| {
    let snapshot = match &b.snapshot_row {
        Some(s) => format!(
            "close={} prev_close={} volume={} traded_value={} market_cap={}",
            s.close, s.prev_close, s.volume, s.traded_value, s.market_cap
        ),
        None => "(no snapshot row for the reference date)".to_string(),
    };
    format!("{}\n\nLatest session:\n{}", b.meta_block(), snapshot)
});

section_agent!(CompanyOverviewAgent, AnalysisSection::CompanyOverview, |b| {
    format!(
        "{}\n\nSector: {}\nIndustry: {}\nExchange: {}",
        b.meta_block(),
        b.meta.sector,
        b.meta.industry,
        b.meta.listing_exchange
    )
});

section_agent!(NewsAgent, AnalysisSection::News, |b| {
    format!(
        "{}\n\nScored headlines (sentiment in parentheses):\n{}",
        b.meta_block(),
        b.headlines_block()
    )
});

section_agent!(MarketIndexAgent, AnalysisSection::MarketIndex, |b| {
    let skip = b.index_bars.len().saturating_sub(20);
    let bars = b
        .index_bars
        .iter()
        .skip(skip)
        .map(|bar| format!("{} c={} v={}", bar.date, bar.close, bar.volume))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Detected regime: {}\nIndex daily bars (most recent last):\n{}",
        b.regime, bars
    )
});

/// Explicit mapping from section to agent, in declared report order.
pub struct AgentRegistry {
    agents: Vec<Arc<dyn SectionAgent>>,
}

impl AgentRegistry {
    /// The standard six-agent lineup.
    pub fn standard() -> Self {
        Self {
            agents: vec![
                Arc::new(PriceVolumeAgent),
                Arc::new(HoldingsAgent),
                Arc::new(CompanyStatusAgent),
                Arc::new(CompanyOverviewAgent),
                Arc::new(NewsAgent),
                Arc::new(MarketIndexAgent),
            ],
        }
    }

    pub fn agent_for(&self, section: AnalysisSection) -> Option<&Arc<dyn SectionAgent>> {
        self.agents.iter().find(|a| a.section() == section)
    }

    pub fn ordered(&self) -> impl Iterator<Item = &Arc<dyn SectionAgent>> {
        AnalysisSection::ORDER
            .iter()
            .filter_map(|s| self.agent_for(*s))
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
