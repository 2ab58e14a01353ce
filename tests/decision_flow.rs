//! Buy and sell decision flows against an in-memory store.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sagetrade::application::agents::TickerReport;
use sagetrade::application::agents::sections::{AnalysisSection, SectionOutput};
use sagetrade::application::decision::{BuyDecision, BuyEngine, SellEngine, SellOutcome};
use sagetrade::application::memory::TradingMemory;
use sagetrade::application::screener::ScoredCandidate;
use sagetrade::application::screener::scoring::FitLevels;
use sagetrade::application::screener::triggers::TriggerHit;
use sagetrade::application::session::SessionContext;
use sagetrade::config::{MemoryConfig, TradingConfig};
use sagetrade::domain::market::regime::Regime;
use sagetrade::domain::market::ticker::{Realm, Ticker};
use sagetrade::domain::ports::TokenUsage;
use sagetrade::domain::trading::scenario::{InvestmentPeriod, Scenario};
use sagetrade::domain::trading::trigger::{SessionMode, TriggerKind};
use sagetrade::domain::trading::types::Holding;
use sagetrade::infrastructure::mock::{MockLlm, MockMarketData};
use sagetrade::infrastructure::persistence::Database;
use sagetrade::infrastructure::persistence::repositories::{
    SqliteHoldingRepository, SqliteJournalRepository, SqliteKnowledgeRepository,
    SqliteTrackerRepository, SqliteTradeRepository, SqliteWatchlistRepository,
};
use std::collections::HashMap;
use std::sync::Arc;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

async fn memory_with_llm(llm: Arc<MockLlm>) -> Arc<TradingMemory> {
    let db = Database::in_memory().await.unwrap();
    Arc::new(TradingMemory::new(
        Arc::new(SqliteHoldingRepository::new(db.pool.clone())),
        Arc::new(SqliteTradeRepository::new(db.pool.clone())),
        Arc::new(SqliteWatchlistRepository::new(db.pool.clone())),
        Arc::new(SqliteJournalRepository::new(db.pool.clone())),
        Arc::new(SqliteKnowledgeRepository::new(db.pool.clone())),
        Arc::new(SqliteTrackerRepository::new(db.pool.clone())),
        llm,
        MemoryConfig::from_env(),
    ))
}

fn trading_config() -> TradingConfig {
    TradingConfig {
        capital_base_kr: dec!(100_000_000),
        capital_base_us: dec!(100_000),
    }
}

fn report_for(code: &str, sector: &str) -> TickerReport {
    TickerReport {
        ticker: Ticker::us(code),
        company_name: code.to_string(),
        sector: sector.to_string(),
        reference_date: day(),
        language: "en".to_string(),
        sections: AnalysisSection::ORDER
            .iter()
            .map(|s| SectionOutput {
                section: *s,
                content: format!("{} content", s),
                degraded: false,
            })
            .collect(),
        strategy: "strategy".to_string(),
        strategy_degraded: false,
        summary: None,
        usage: TokenUsage::default(),
    }
}

fn scored_candidate(code: &str) -> ScoredCandidate {
    scored_candidate_with(code, TriggerKind::VolumeSurge)
}

fn scored_candidate_with(code: &str, trigger: TriggerKind) -> ScoredCandidate {
    ScoredCandidate {
        hit: TriggerHit {
            trigger,
            ticker: Ticker::us(code),
            trading_day: day(),
            composite_score: 1.0,
            metrics: HashMap::new(),
        },
        levels: FitLevels {
            current_price: dec!(100),
            stop_loss_price: dec!(95),
            target_price: dec!(120),
            risk_reward: 4.0,
            agent_fit: 1.0,
        },
        final_score: 1.0,
    }
}

fn holding(code: &str, sector: &str, entry: Decimal, target: Decimal, stop: Decimal) -> Holding {
    Holding {
        ticker: Ticker::us(code),
        name: code.to_string(),
        sector: sector.to_string(),
        buy_price: entry,
        buy_date: day(),
        quantity: dec!(10),
        trigger: TriggerKind::VolumeSurge,
        session: SessionMode::Morning,
        scenario: Scenario {
            entry_price: entry,
            target_price: target,
            stop_loss_price: stop,
            investment_period: InvestmentPeriod::Short,
            buy_score: 8,
            rationale: "momentum entry".to_string(),
            key_levels: vec![],
            sell_triggers: vec!["close below 20-day average".to_string()],
            hold_conditions: vec![],
        },
        scenario_history: vec![],
        current_price: entry,
        last_updated: Utc::now(),
    }
}

const BUY_RESPONSE: &str = r#"{
    "decision": "buy", "buy_score": 9,
    "entry_price": 100, "target_price": 120, "stop_loss_price": 95,
    "investment_period": "short",
    "rationale": "strong volume surge with clean structure",
    "key_levels": ["100", "120"], "sell_triggers": ["stop breach"],
    "hold_conditions": ["volume stays elevated"]
}"#;

#[tokio::test]
async fn test_buy_accepted_creates_holding() {
    let llm = Arc::new(MockLlm::new());
    llm.respond("buy", BUY_RESPONSE);
    let memory = memory_with_llm(llm.clone()).await;
    let engine = BuyEngine::new(llm.clone(), memory.clone(), trading_config());
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let mut usage = TokenUsage::default();
    let decision = engine
        .decide(
            &report_for("WMT", "Retail"),
            &scored_candidate("WMT"),
            &session,
            Regime::Bull,
            &mut usage,
        )
        .await
        .unwrap();

    let BuyDecision::Bought(holding) = decision else {
        panic!("expected a buy");
    };
    assert_eq!(holding.ticker.code, "WMT");
    // 10,000 position at 100 = 100 shares
    assert_eq!(holding.quantity, dec!(100));
    assert!(holding.scenario.stop_loss_price < holding.scenario.entry_price);
    assert!(holding.scenario.entry_price < holding.scenario.target_price);

    let portfolio = memory.portfolio(Realm::Us, dec!(100_000)).await.unwrap();
    assert_eq!(portfolio.holdings.len(), 1);
    assert!(usage.total() > 0);
}

#[tokio::test]
async fn test_sector_cap_refuses_even_a_high_score() {
    let llm = Arc::new(MockLlm::new());
    llm.respond("buy", BUY_RESPONSE);
    let memory = memory_with_llm(llm.clone()).await;

    for code in ["NVDA", "AMD", "AVGO"] {
        memory
            .create_holding(&holding(code, "Semiconductors", dec!(100), dec!(120), dec!(95)))
            .await
            .unwrap();
    }

    let engine = BuyEngine::new(llm.clone(), memory.clone(), trading_config());
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());
    let mut usage = TokenUsage::default();
    let decision = engine
        .decide(
            &report_for("MU", "Semiconductors"),
            &scored_candidate("MU"),
            &session,
            Regime::Bull,
            &mut usage,
        )
        .await
        .unwrap();

    let BuyDecision::Skipped { reason } = decision else {
        panic!("expected a skip");
    };
    assert!(reason.contains("sector cap"), "reason: {}", reason);

    // The refusal is recorded on the watchlist and nothing was committed
    let watchlist = memory.recent_watchlist(Realm::Us, 10).await.unwrap();
    assert_eq!(watchlist.len(), 1);
    assert_eq!(watchlist[0].ticker.code, "MU");
    let portfolio = memory.portfolio(Realm::Us, dec!(100_000)).await.unwrap();
    assert_eq!(portfolio.holdings.len(), 3);
}

#[tokio::test]
async fn test_full_portfolio_skips_without_calling_agent() {
    let llm = Arc::new(MockLlm::new());
    let memory = memory_with_llm(llm.clone()).await;

    for i in 0..10 {
        memory
            .create_holding(&holding(
                &format!("T{}", i),
                &format!("S{}", i),
                dec!(100),
                dec!(120),
                dec!(95),
            ))
            .await
            .unwrap();
    }

    let engine = BuyEngine::new(llm.clone(), memory.clone(), trading_config());
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());
    let mut usage = TokenUsage::default();
    let decision = engine
        .decide(
            &report_for("WMT", "Retail"),
            &scored_candidate("WMT"),
            &session,
            Regime::Bull,
            &mut usage,
        )
        .await
        .unwrap();

    assert!(matches!(decision, BuyDecision::Skipped { .. }));
    assert_eq!(llm.calls_for("buy"), 0);
}

#[tokio::test]
async fn test_unparseable_buy_response_degrades_to_skip() {
    let llm = Arc::new(MockLlm::new());
    llm.respond("buy", "I would definitely buy this one!");
    let memory = memory_with_llm(llm.clone()).await;
    let engine = BuyEngine::new(llm.clone(), memory.clone(), trading_config());
    let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

    let mut usage = TokenUsage::default();
    let decision = engine
        .decide(
            &report_for("WMT", "Retail"),
            &scored_candidate("WMT"),
            &session,
            Regime::Bull,
            &mut usage,
        )
        .await
        .unwrap();

    let BuyDecision::Skipped { reason } = decision else {
        panic!("expected a skip");
    };
    assert!(reason.contains("agent failure"), "reason: {}", reason);
    // Original call plus one corrective repair attempt
    assert_eq!(llm.calls_for("buy"), 2);
}

#[tokio::test]
async fn test_bear_regime_gates_what_bull_accepts() {
    // R/R = 8 / 4.5 = 1.78 on a value-to-cap entry (trigger floor 1.5):
    // above the bull gate (1.5), below the bear gate (2.0). The same
    // setup must buy in a bull and skip in a bear.
    let response = r#"{
        "decision": "buy", "buy_score": 9,
        "entry_price": 100, "target_price": 108, "stop_loss_price": 95.5,
        "investment_period": "short", "rationale": "ok"
    }"#;

    for (regime, expect_buy) in [(Regime::Bull, true), (Regime::Bear, false)] {
        let llm = Arc::new(MockLlm::new());
        llm.respond("buy", response);
        let memory = memory_with_llm(llm.clone()).await;
        let engine = BuyEngine::new(llm.clone(), memory.clone(), trading_config());
        let session = SessionContext::new(Realm::Us, SessionMode::Morning, day());

        let mut usage = TokenUsage::default();
        let decision = engine
            .decide(
                &report_for("WMT", "Retail"),
                &scored_candidate_with("WMT", TriggerKind::ValueToCap),
                &session,
                regime,
                &mut usage,
            )
            .await
            .unwrap();

        match (expect_buy, decision) {
            (true, BuyDecision::Bought(_)) => {}
            (false, BuyDecision::Skipped { reason }) => {
                assert!(reason.contains("risk/reward"), "reason: {}", reason);
            }
            (expected, got) => panic!("{:?}: expected buy={}, got {:?}", regime, expected, got),
        }
    }
}

#[tokio::test]
async fn test_stop_breach_forces_sell_and_journals() {
    let llm = Arc::new(MockLlm::new());
    let memory = memory_with_llm(llm.clone()).await;
    let market = Arc::new(MockMarketData::new(Realm::Us));

    let h = holding("WMT", "Retail", dec!(100), dec!(120), dec!(95));
    memory.create_holding(&h).await.unwrap();
    market.set_quote(&h.ticker, dec!(94));

    let engine = SellEngine::new(llm.clone(), memory.clone(), market);
    let session = SessionContext::new(Realm::Us, SessionMode::Afternoon, day());
    let mut usage = TokenUsage::default();
    let outcomes = engine
        .sweep(&session, Regime::Sideways, dec!(100_000), &mut usage)
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 1);
    let SellOutcome::Sold(trade) = &outcomes[0] else {
        panic!("expected a sale");
    };
    assert_eq!(trade.sell_price, dec!(94));
    assert!(trade.profit_rate < 0.0);
    // Stop-loss sells bypass the agent entirely
    assert_eq!(llm.calls_for("sell"), 0);

    // Holding gone, trade recorded, retrospective written
    let portfolio = memory.portfolio(Realm::Us, dec!(100_000)).await.unwrap();
    assert!(portfolio.holdings.is_empty());
    let trades = memory.recent_trades(&h.ticker, 5).await.unwrap();
    assert_eq!(trades.len(), 1);
    let journals = memory.journals_for_ticker(&h.ticker, 5).await.unwrap();
    assert_eq!(journals.len(), 1);
    assert_eq!(
        journals[0].layer,
        sagetrade::domain::memory::journal::CompressionLayer::Detailed
    );
}

#[tokio::test]
async fn test_sell_agent_hold_keeps_position() {
    let llm = Arc::new(MockLlm::new());
    let memory = memory_with_llm(llm.clone()).await;
    let market = Arc::new(MockMarketData::new(Realm::Us));

    let h = holding("WMT", "Retail", dec!(100), dec!(120), dec!(95));
    memory.create_holding(&h).await.unwrap();
    market.set_quote(&h.ticker, dec!(105));

    let engine = SellEngine::new(llm.clone(), memory.clone(), market);
    let session = SessionContext::new(Realm::Us, SessionMode::Afternoon, day());
    let mut usage = TokenUsage::default();
    let outcomes = engine
        .sweep(&session, Regime::Bull, dec!(100_000), &mut usage)
        .await
        .unwrap();

    assert!(matches!(outcomes[0], SellOutcome::Held { .. }));
    assert_eq!(llm.calls_for("sell"), 1);

    // The price refresh persisted
    let portfolio = memory.portfolio(Realm::Us, dec!(100_000)).await.unwrap();
    assert_eq!(portfolio.holdings[0].current_price, dec!(105));
}

#[tokio::test]
async fn test_sell_agent_adjustment_preserves_history() {
    let llm = Arc::new(MockLlm::new());
    llm.respond(
        "sell",
        r#"{"should_sell": false, "sell_reason": "", "confidence": 0.6,
            "adjustment": {"target_price": 130, "stop_loss_price": 100}}"#,
    );
    let memory = memory_with_llm(llm.clone()).await;
    let market = Arc::new(MockMarketData::new(Realm::Us));

    let h = holding("WMT", "Retail", dec!(100), dec!(120), dec!(95));
    memory.create_holding(&h).await.unwrap();
    market.set_quote(&h.ticker, dec!(115));

    let engine = SellEngine::new(llm.clone(), memory.clone(), market);
    let session = SessionContext::new(Realm::Us, SessionMode::Afternoon, day());
    let mut usage = TokenUsage::default();
    let outcomes = engine
        .sweep(&session, Regime::Bull, dec!(100_000), &mut usage)
        .await
        .unwrap();

    assert!(matches!(outcomes[0], SellOutcome::Adjusted { .. }));
    let portfolio = memory.portfolio(Realm::Us, dec!(100_000)).await.unwrap();
    let updated = &portfolio.holdings[0];
    assert_eq!(updated.scenario.target_price, dec!(130));
    assert_eq!(updated.scenario.stop_loss_price, dec!(100));
    assert_eq!(updated.scenario_history.len(), 1);
    assert_eq!(updated.scenario_history[0].target_price, dec!(120));
}

#[tokio::test]
async fn test_sell_agent_failure_degrades_to_hold() {
    let llm = Arc::new(MockLlm::new());
    llm.respond("sell", "definitely not json");
    let memory = memory_with_llm(llm.clone()).await;
    let market = Arc::new(MockMarketData::new(Realm::Us));

    let h = holding("WMT", "Retail", dec!(100), dec!(120), dec!(95));
    memory.create_holding(&h).await.unwrap();
    market.set_quote(&h.ticker, dec!(110));

    let engine = SellEngine::new(llm.clone(), memory.clone(), market);
    let session = SessionContext::new(Realm::Us, SessionMode::Afternoon, day());
    let mut usage = TokenUsage::default();
    let outcomes = engine
        .sweep(&session, Regime::Bull, dec!(100_000), &mut usage)
        .await
        .unwrap();

    assert!(matches!(outcomes[0], SellOutcome::Held { .. }));
    let portfolio = memory.portfolio(Realm::Us, dec!(100_000)).await.unwrap();
    assert_eq!(portfolio.holdings.len(), 1);
}
