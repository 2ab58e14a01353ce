//! Report pipeline behavior: section ordering, graceful degradation, and
//! the per-session market-index cache.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use sagetrade::application::agents::pipeline::{PipelineConfig, ReportPipeline};
use sagetrade::application::agents::sections::AnalysisSection;
use sagetrade::application::session::SessionContext;
use sagetrade::domain::market::candle::{CompanyMeta, DailyBar};
use sagetrade::domain::market::ticker::{Realm, Ticker};
use sagetrade::domain::trading::trigger::SessionMode;
use sagetrade::infrastructure::mock::{MockHeadlines, MockLlm, MockMarketData};
use std::sync::Arc;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn bars(n: usize) -> Vec<DailyBar> {
    (0..n)
        .map(|i| {
            let c = 100.0 + i as f64 * 0.3;
            DailyBar {
                date: day() - chrono::Days::new((n - i) as u64),
                open: Decimal::from_f64(c - 0.2).unwrap(),
                high: Decimal::from_f64(c + 0.5).unwrap(),
                low: Decimal::from_f64(c - 0.5).unwrap(),
                close: Decimal::from_f64(c).unwrap(),
                volume: 1_000_000,
            }
        })
        .collect()
}

fn provider_with(codes: &[&str]) -> MockMarketData {
    let mut provider = MockMarketData::new(Realm::Us);
    for code in codes {
        let ticker = Ticker::us(*code);
        provider.metas.insert(
            ticker.clone(),
            CompanyMeta {
                ticker: ticker.clone(),
                name: format!("{} Inc", code),
                sector: "Tech".to_string(),
                industry: "Software".to_string(),
                market_cap: dec!(100_000_000_000),
                listing_exchange: "NASDAQ".to_string(),
            },
        );
        provider.bars.insert(ticker, bars(90));
    }
    provider.index_bars = bars(120);
    provider
}

fn pipeline(llm: Arc<MockLlm>, provider: MockMarketData) -> ReportPipeline {
    ReportPipeline::new(
        llm,
        Arc::new(provider),
        Arc::new(MockHeadlines::empty()),
        PipelineConfig::fast(),
    )
}

#[tokio::test]
async fn test_report_sections_arrive_in_declared_order() {
    let llm = Arc::new(MockLlm::new());
    let pipeline = pipeline(llm, provider_with(&["WMT"]));
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let report = pipeline
        .generate(&Ticker::us("WMT"), &session, "en")
        .await
        .unwrap();

    let sections: Vec<AnalysisSection> = report.sections.iter().map(|s| s.section).collect();
    assert_eq!(sections, AnalysisSection::ORDER.to_vec());
    assert_eq!(report.degraded_sections(), 0);
    assert!(!report.strategy_degraded);
    assert!(report.summary.is_some());
    assert!(report.usage.total() > 0);
}

#[tokio::test]
async fn test_failed_section_degrades_to_placeholder() {
    let llm = Arc::new(MockLlm::new());
    // Exhaust the full attempt budget (initial call + 2 retries)
    llm.fail_transiently("news_analysis", 3);
    let pipeline = pipeline(llm.clone(), provider_with(&["WMT"]));
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let report = pipeline
        .generate(&Ticker::us("WMT"), &session, "en")
        .await
        .unwrap();

    let news = report
        .sections
        .iter()
        .find(|s| s.section == AnalysisSection::News)
        .unwrap();
    assert!(news.degraded);
    assert_eq!(news.content, "Analysis unavailable: news_analysis");

    // Everything downstream still ran
    assert!(!report.strategy_degraded);
    assert!(report.summary.is_some());
    let others = report
        .sections
        .iter()
        .filter(|s| s.section != AnalysisSection::News);
    assert!(others.clone().count() == 5 && others.clone().all(|s| !s.degraded));
    assert_eq!(llm.calls_for("news_analysis"), 3);
}

#[tokio::test]
async fn test_transient_failure_recovers_within_budget() {
    let llm = Arc::new(MockLlm::new());
    llm.fail_transiently("news_analysis", 2);
    let pipeline = pipeline(llm.clone(), provider_with(&["WMT"]));
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let report = pipeline
        .generate(&Ticker::us("WMT"), &session, "en")
        .await
        .unwrap();

    let news = report
        .sections
        .iter()
        .find(|s| s.section == AnalysisSection::News)
        .unwrap();
    assert!(!news.degraded);
    assert_eq!(llm.calls_for("news_analysis"), 3);
}

#[tokio::test]
async fn test_market_index_analysis_cached_across_tickers() {
    let llm = Arc::new(MockLlm::new());
    let pipeline = pipeline(llm.clone(), provider_with(&["WMT", "MSFT"]));
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let first = pipeline
        .generate(&Ticker::us("WMT"), &session, "en")
        .await
        .unwrap();
    let second = pipeline
        .generate(&Ticker::us("MSFT"), &session, "en")
        .await
        .unwrap();

    // Computed once, reused for the second ticker
    assert_eq!(llm.calls_for("market_index_analysis"), 1);
    let index_of = |r: &sagetrade::application::agents::TickerReport| {
        r.sections
            .iter()
            .find(|s| s.section == AnalysisSection::MarketIndex)
            .unwrap()
            .content
            .clone()
    };
    assert_eq!(index_of(&first), index_of(&second));
}

#[tokio::test]
async fn test_unknown_ticker_fails_the_report() {
    let llm = Arc::new(MockLlm::new());
    let pipeline = pipeline(llm, provider_with(&[]));
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let result = pipeline.generate(&Ticker::us("ZZZZ"), &session, "en").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_report_markdown_carries_fixed_headers() {
    let llm = Arc::new(MockLlm::new());
    let pipeline = pipeline(llm, provider_with(&["WMT"]));
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let report = pipeline
        .generate(&Ticker::us("WMT"), &session, "en")
        .await
        .unwrap();
    let md = report.to_markdown();

    for section in AnalysisSection::ORDER {
        assert!(md.contains(&format!("## {}", section.title())), "{}", section);
    }
    assert!(md.contains("## Integrated Strategy"));
}
