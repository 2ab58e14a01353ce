//! Sequential report generation for one ticker.
//!
//! Sections run one at a time with a fixed pause between them; a section
//! that fails after retries degrades to a placeholder and the strategy
//! synthesis proceeds with whatever completed. The market-index analysis
//! is computed once per session and reused across tickers.

use crate::application::agents::report::TickerReport;
use crate::application::agents::sections::{AnalysisSection, SectionOutput};
use crate::application::agents::{
    AgentRegistry, TickerBundle, indicators, prompts, summary,
};
use crate::application::session::{MarketOverview, SessionContext};
use crate::domain::errors::AgentError;
use crate::domain::market::regime::RegimeDetector;
use crate::domain::market::ticker::Ticker;
use crate::domain::ports::{
    HeadlineSource, LlmProvider, LlmRequest, MarketDataProvider, TokenUsage,
};
use crate::infrastructure::core::retry::{RetryPolicy, retry_transient};
use chrono::Days;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Fixed pause between analytical sections.
    pub section_pause: Duration,
    pub retry: RetryPolicy,
    /// OHLCV lookback for the analysis window, calendar days.
    pub history_days: u64,
    pub headline_limit: usize,
    /// Generate the broadcast summary loop.
    pub with_summary: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            section_pause: Duration::from_secs(2),
            retry: RetryPolicy::upstream_default(),
            history_days: 180,
            headline_limit: 10,
            with_summary: true,
        }
    }
}

impl PipelineConfig {
    /// No pauses, no backoff sleeps. For tests and dry runs.
    pub fn fast() -> Self {
        Self {
            section_pause: Duration::ZERO,
            retry: RetryPolicy::immediate(),
            ..Self::default()
        }
    }
}

pub struct ReportPipeline {
    llm: Arc<dyn LlmProvider>,
    market: Arc<dyn MarketDataProvider>,
    headlines: Arc<dyn HeadlineSource>,
    registry: AgentRegistry,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        market: Arc<dyn MarketDataProvider>,
        headlines: Arc<dyn HeadlineSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            market,
            headlines,
            registry: AgentRegistry::standard(),
            config,
        }
    }

    /// Generate the full report for one ticker. Fails only when company
    /// metadata cannot be resolved; everything downstream degrades
    /// gracefully instead of failing the ticker.
    pub async fn generate(
        &self,
        ticker: &Ticker,
        session: &SessionContext,
        language: &str,
    ) -> Result<TickerReport, AgentError> {
        info!("Generating report for {} ({})", ticker, language);
        let mut usage = TokenUsage::default();

        let meta = retry_transient(&self.config.retry, "company_meta", || {
            self.market.company_meta(ticker)
        })
        .await?;

        let bundle = self.gather(ticker, session, meta).await;

        // Market overview: computed once per session, reused afterwards
        let overview = match session.market_overview().await {
            Some(cached) => cached,
            None => {
                let fresh = self.build_overview(&bundle, language).await;
                usage += fresh.usage;
                session.fill_market_overview(fresh).await
            }
        };

        let mut sections = Vec::with_capacity(AnalysisSection::ORDER.len());
        let agent_count = self.registry.ordered().count();
        for (i, agent) in self.registry.ordered().enumerate() {
            let section = agent.section();
            let output = if section == AnalysisSection::MarketIndex {
                SectionOutput {
                    section,
                    content: overview.narrative.clone(),
                    degraded: overview.degraded,
                }
            } else {
                match retry_transient(&self.config.retry, section.id(), || {
                    agent.invoke(&bundle, language, self.llm.as_ref())
                })
                .await
                {
                    Ok(response) => {
                        usage += response.usage;
                        SectionOutput {
                            section,
                            content: response.text.trim().to_string(),
                            degraded: false,
                        }
                    }
                    Err(e) => {
                        warn!("Section {} failed, degrading to placeholder: {}", section, e);
                        SectionOutput {
                            section,
                            content: section.placeholder(),
                            degraded: true,
                        }
                    }
                }
            };
            sections.push(output);

            if i + 1 < agent_count {
                tokio::time::sleep(self.config.section_pause).await;
            }
        }

        let (strategy, strategy_degraded) =
            self.synthesize_strategy(&bundle, &sections, language, &mut usage).await;

        let mut report = TickerReport {
            ticker: ticker.clone(),
            company_name: bundle.meta.name.clone(),
            sector: bundle.meta.sector.clone(),
            reference_date: session.trading_day,
            language: language.to_string(),
            sections,
            strategy,
            strategy_degraded,
            summary: None,
            usage,
        };

        if self.config.with_summary {
            match summary::summarize(self.llm.as_ref(), &report.to_markdown(), language, &mut report.usage)
                .await
            {
                Ok(broadcast) => report.summary = Some(broadcast),
                Err(e) => warn!("Summary loop failed for {}: {}", ticker, e),
            }
        }

        info!(
            "Report for {} done: {} degraded sections, {} tokens",
            ticker,
            report.degraded_sections(),
            report.usage.total()
        );
        Ok(report)
    }

    /// Gather every input up front. Individual fetch failures leave the
    /// corresponding bundle slice empty; the affected sections degrade in
    /// content rather than failing the ticker.
    async fn gather(
        &self,
        ticker: &Ticker,
        session: &SessionContext,
        meta: crate::domain::market::candle::CompanyMeta,
    ) -> TickerBundle {
        let day = session.trading_day;
        let start = day - Days::new(self.config.history_days);

        let bars = match retry_transient(&self.config.retry, "ohlcv", || {
            self.market.ohlcv(ticker, start, day)
        })
        .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!("OHLCV fetch failed for {}: {}", ticker, e);
                Vec::new()
            }
        };

        let holders = match self.market.institutional_holders(ticker).await {
            Ok(h) => h,
            Err(e) => {
                warn!("Holder fetch failed for {}: {}", ticker, e);
                Vec::new()
            }
        };

        let query = if meta.name.is_empty() {
            ticker.code.clone()
        } else {
            meta.name.clone()
        };
        let headlines = match self
            .headlines
            .recent_headlines(&query, self.config.headline_limit)
            .await
        {
            Ok(h) => h,
            Err(e) => {
                warn!("Headline fetch failed for {}: {}", ticker, e);
                Vec::new()
            }
        };

        let snapshot_row = match session.snapshot(self.market.as_ref(), day).await {
            Ok(map) => map.get(ticker).cloned(),
            Err(e) => {
                warn!("Snapshot fetch failed for {}: {}", ticker, e);
                None
            }
        };

        let index_bars = match retry_transient(&self.config.retry, "index_ohlcv", || {
            self.market.index_ohlcv(start, day)
        })
        .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!("Index fetch failed: {}", e);
                Vec::new()
            }
        };
        let regime = RegimeDetector::default().detect(&index_bars);

        let indicators = indicators::compute(&bars);

        TickerBundle {
            ticker: ticker.clone(),
            meta,
            reference_date: day,
            snapshot_row,
            bars,
            indicators,
            holders,
            headlines,
            index_bars,
            regime,
        }
    }

    async fn build_overview(&self, bundle: &TickerBundle, language: &str) -> MarketOverview {
        let mut usage = TokenUsage::default();
        let agent = self
            .registry
            .agent_for(AnalysisSection::MarketIndex)
            .expect("registry always carries the market-index agent");

        let result = retry_transient(&self.config.retry, "market_index_analysis", || {
            agent.invoke(bundle, language, self.llm.as_ref())
        })
        .await;

        match result {
            Ok(response) => {
                usage += response.usage;
                MarketOverview {
                    regime: bundle.regime,
                    narrative: response.text.trim().to_string(),
                    degraded: false,
                    usage,
                }
            }
            Err(e) => {
                warn!("Market overview degraded: {}", e);
                MarketOverview {
                    regime: bundle.regime,
                    narrative: AnalysisSection::MarketIndex.placeholder(),
                    degraded: true,
                    usage,
                }
            }
        }
    }

    async fn synthesize_strategy(
        &self,
        bundle: &TickerBundle,
        sections: &[SectionOutput],
        language: &str,
        usage: &mut TokenUsage,
    ) -> (String, bool) {
        let sections_text = sections
            .iter()
            .map(|s| format!("### {}\n{}", s.section.title(), s.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let request = LlmRequest {
            system: prompts::strategy_system_prompt(language),
            user: format!(
                "Company: {} ({})\nReference date: {}\n\n{}",
                bundle.meta.name, bundle.ticker, bundle.reference_date, sections_text
            ),
            temperature: 0.4,
            max_tokens: 4096,
        };

        match retry_transient(&self.config.retry, "strategy_synthesis", || {
            self.llm.complete(request.clone())
        })
        .await
        {
            Ok(response) => {
                *usage += response.usage;
                (response.text.trim().to_string(), false)
            }
            Err(e) => {
                warn!("Strategy synthesis degraded: {}", e);
                ("Analysis unavailable: strategy".to_string(), true)
            }
        }
    }
}
