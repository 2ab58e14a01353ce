//! Journal compression lifecycle, knowledge cleanup, and the
//! context/adjustment service.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal_macros::dec;
use sagetrade::application::memory::TradingMemory;
use sagetrade::config::MemoryConfig;
use sagetrade::domain::market::ticker::{Realm, Ticker};
use sagetrade::domain::memory::journal::{CompressionLayer, JournalEntry, PerformanceRow};
use sagetrade::domain::repositories::{
    JournalRepository, KnowledgeRepository, PerformanceTrackerRepository,
};
use sagetrade::domain::trading::trigger::TriggerKind;
use sagetrade::domain::trading::types::SellReason;
use sagetrade::infrastructure::mock::MockLlm;
use sagetrade::infrastructure::persistence::Database;
use sagetrade::infrastructure::persistence::repositories::{
    SqliteHoldingRepository, SqliteJournalRepository, SqliteKnowledgeRepository,
    SqliteTrackerRepository, SqliteTradeRepository, SqliteWatchlistRepository,
};
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    memory: Arc<TradingMemory>,
    journals: Arc<SqliteJournalRepository>,
    knowledge: Arc<SqliteKnowledgeRepository>,
    tracker: Arc<SqliteTrackerRepository>,
}

async fn fixture(config: MemoryConfig) -> Fixture {
    let db = Database::in_memory().await.unwrap();
    let journals = Arc::new(SqliteJournalRepository::new(db.pool.clone()));
    let knowledge = Arc::new(SqliteKnowledgeRepository::new(db.pool.clone()));
    let tracker = Arc::new(SqliteTrackerRepository::new(db.pool.clone()));

    let memory = Arc::new(TradingMemory::new(
        Arc::new(SqliteHoldingRepository::new(db.pool.clone())),
        Arc::new(SqliteTradeRepository::new(db.pool.clone())),
        Arc::new(SqliteWatchlistRepository::new(db.pool.clone())),
        journals.clone(),
        knowledge.clone(),
        tracker.clone(),
        Arc::new(MockLlm::new()),
        config,
    ));

    Fixture {
        memory,
        journals,
        knowledge,
        tracker,
    }
}

fn journal(
    code: &str,
    sector: &str,
    profit_rate: f64,
    age_days: i64,
    layer: CompressionLayer,
    tag: &str,
) -> JournalEntry {
    let now = Utc::now();
    JournalEntry {
        id: Uuid::new_v4().to_string(),
        trade_id: Uuid::new_v4().to_string(),
        ticker: Ticker::us(code),
        sector: sector.to_string(),
        trigger: TriggerKind::VolumeSurge,
        buy_date: (now - Duration::days(age_days + 3)).date_naive(),
        sell_date: (now - Duration::days(age_days)).date_naive(),
        sell_reason: SellReason::TargetReached,
        profit_rate,
        buy_context: "entered on surge".to_string(),
        sell_context: "exited at target".to_string(),
        situation_analysis: "clean setup".to_string(),
        judgment_evaluation: "plan followed".to_string(),
        lessons: vec!["let winners run".to_string()],
        pattern_tags: vec![tag.to_string()],
        one_line_summary: format!("{} momentum trade", code),
        confidence: 0.8,
        layer,
        compressed_summary: None,
        created_at: now - Duration::days(age_days),
    }
}

#[tokio::test]
async fn test_layer1_promotes_to_layer2_with_summary_form() {
    let f = fixture(MemoryConfig::from_env()).await;
    let entry = journal("WMT", "Retail", 0.043, 8, CompressionLayer::Detailed, "momentum");
    f.journals.insert(&entry).await.unwrap();

    let report = f.memory.compress(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(report.promoted_to_layer2, 1);
    assert_eq!(report.promoted_to_layer3, 0);

    let promoted = f
        .journals
        .find_by_layer(Realm::Us, CompressionLayer::Summarized)
        .await
        .unwrap();
    assert_eq!(promoted.len(), 1);
    let summary = promoted[0].compressed_summary.as_ref().unwrap();
    // "{sector} + {trigger} → {action} → {outcome}"
    assert!(summary.starts_with("Retail + volume_surge → target_reached → win"), "{}", summary);
}

#[tokio::test]
async fn test_compress_is_idempotent() {
    let f = fixture(MemoryConfig::from_env()).await;
    f.journals
        .insert(&journal("WMT", "Retail", 0.043, 8, CompressionLayer::Detailed, "momentum"))
        .await
        .unwrap();

    let now = Utc::now();
    let first = f.memory.compress(Realm::Us, now, false).await.unwrap();
    assert_eq!(first.promoted_to_layer2, 1);

    let second = f.memory.compress(Realm::Us, now, false).await.unwrap();
    assert_eq!(second.promoted_to_layer2, 0);
    assert_eq!(second.promoted_to_layer3, 0);

    let l2 = f
        .journals
        .find_by_layer(Realm::Us, CompressionLayer::Summarized)
        .await
        .unwrap();
    assert_eq!(l2.len(), 1);
}

#[tokio::test]
async fn test_fresh_journal_stays_at_layer1() {
    let f = fixture(MemoryConfig::from_env()).await;
    f.journals
        .insert(&journal("WMT", "Retail", 0.02, 2, CompressionLayer::Detailed, "momentum"))
        .await
        .unwrap();

    let report = f.memory.compress(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(report.promoted_to_layer2, 0);

    let l1 = f
        .journals
        .find_by_layer(Realm::Us, CompressionLayer::Detailed)
        .await
        .unwrap();
    assert_eq!(l1.len(), 1);
}

#[tokio::test]
async fn test_layer2_promotes_to_layer3_and_aggregates_intuitions() {
    let f = fixture(MemoryConfig::from_env()).await;
    // Three aged wins and one loss, same sector/trigger/pattern
    for (code, profit) in [("NVDA", 0.08), ("AMD", 0.05), ("AVGO", 0.06), ("MU", -0.03)] {
        f.journals
            .insert(&journal(code, "Semiconductors", profit, 40, CompressionLayer::Summarized, "momentum"))
            .await
            .unwrap();
    }

    let report = f.memory.compress(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(report.promoted_to_layer3, 4);
    assert_eq!(report.intuitions_updated, 1);

    let intuitions = f
        .knowledge
        .active_intuitions(Realm::Us, Some("Semiconductors"), 5)
        .await
        .unwrap();
    assert_eq!(intuitions.len(), 1);
    let intuition = &intuitions[0];
    assert_eq!(intuition.subcategory, "volume_surge");
    assert_eq!(intuition.condition, "momentum");
    assert_eq!(intuition.supporting_trades, 4);
    assert!((intuition.success_rate - 0.75).abs() < 1e-9);

    // A second pass recomputes the same aggregate
    let again = f.memory.compress(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(again.promoted_to_layer3, 0);
    let intuitions = f
        .knowledge
        .active_intuitions(Realm::Us, Some("Semiconductors"), 5)
        .await
        .unwrap();
    assert_eq!(intuitions.len(), 1);
    assert_eq!(intuitions[0].supporting_trades, 4);
}

#[tokio::test]
async fn test_cleanup_deletes_archived_layer3() {
    let mut config = MemoryConfig::from_env();
    config.archive_days = 180;
    let f = fixture(config).await;

    f.journals
        .insert(&journal("OLD", "Retail", 0.01, 200, CompressionLayer::Compressed, "stale"))
        .await
        .unwrap();
    f.journals
        .insert(&journal("NEW", "Retail", 0.01, 40, CompressionLayer::Compressed, "fresh"))
        .await
        .unwrap();

    let report = f.memory.cleanup(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(report.journals_deleted, 1);

    let remaining = f
        .journals
        .find_by_layer(Realm::Us, CompressionLayer::Compressed)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].ticker.code, "NEW");

    // Idempotent for the same clock
    let again = f.memory.cleanup(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(again.journals_deleted, 0);
}

#[tokio::test]
async fn test_market_discriminator_segregates_realms() {
    let f = fixture(MemoryConfig::from_env()).await;
    let mut kr_entry = journal("005930", "Tech", 0.02, 8, CompressionLayer::Detailed, "momentum");
    kr_entry.ticker = Ticker::kr("005930");
    f.journals.insert(&kr_entry).await.unwrap();

    // Compressing the US market must not touch the KR journal
    let report = f.memory.compress(Realm::Us, Utc::now(), false).await.unwrap();
    assert_eq!(report.promoted_to_layer2, 0);

    let report = f.memory.compress(Realm::Kr, Utc::now(), false).await.unwrap();
    assert_eq!(report.promoted_to_layer2, 1);
}

fn tracker_row(code: &str, age_days: i64) -> PerformanceRow {
    PerformanceRow {
        ticker: Ticker::us(code),
        analyzed_date: (Utc::now() - Duration::days(age_days)).date_naive(),
        trigger: TriggerKind::VolumeSurge,
        price_t0: dec!(100),
        price_7d: None,
        price_14d: None,
        price_30d: None,
    }
}

#[tokio::test]
async fn test_performance_stats_need_three_matured_rows() {
    let f = fixture(MemoryConfig::from_env()).await;

    for (i, ret) in [5.0_f64, -2.0, 4.0].iter().enumerate() {
        let row = tracker_row(&format!("T{}", i), 20 + i as i64);
        f.tracker.insert(&row).await.unwrap();
        // Two matured rows first; stats must stay absent
        if i < 2 {
            f.tracker
                .fill_horizon(
                    &row.ticker,
                    row.analyzed_date,
                    row.trigger,
                    7,
                    dec!(100) + rust_decimal::Decimal::from_f64_retain(*ret).unwrap(),
                )
                .await
                .unwrap();
        }
    }

    let stats = f
        .memory
        .performance_stats(Realm::Us, TriggerKind::VolumeSurge)
        .await
        .unwrap();
    assert!(stats.is_none());

    // Mature the third row
    let row = tracker_row("T2", 22);
    f.tracker
        .fill_horizon(&row.ticker, row.analyzed_date, row.trigger, 7, dec!(104))
        .await
        .unwrap();

    let stats = f
        .memory
        .performance_stats(Realm::Us, TriggerKind::VolumeSurge)
        .await
        .unwrap()
        .expect("stats after three matured rows");
    assert_eq!(stats.n, 3);
    assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_context_for_ticker_is_bounded_and_informative() {
    let f = fixture(MemoryConfig::from_env()).await;
    let ticker = Ticker::us("WMT");

    let empty = f
        .memory
        .context_for_ticker(&ticker, "Retail", TriggerKind::VolumeSurge)
        .await
        .unwrap();
    assert!(empty.contains("No trading history"));

    // Seed enough matured tracker rows for stats to appear
    for i in 0..5 {
        let row = tracker_row(&format!("S{}", i), 20 + i as i64);
        f.tracker.insert(&row).await.unwrap();
        f.tracker
            .fill_horizon(&row.ticker, row.analyzed_date, row.trigger, 7, dec!(106))
            .await
            .unwrap();
    }

    let context = f
        .memory
        .context_for_ticker(&ticker, "Retail", TriggerKind::VolumeSurge)
        .await
        .unwrap();
    assert!(context.contains("Trigger track record"));
    assert!(context.chars().count() <= 2400);
}

#[tokio::test]
async fn test_score_adjustment_rewards_strong_trigger_history() {
    let f = fixture(MemoryConfig::from_env()).await;
    let ticker = Ticker::us("WMT");

    // Five matured winners on this trigger: +6% each
    for i in 0..5 {
        let row = tracker_row(&format!("S{}", i), 20 + i as i64);
        f.tracker.insert(&row).await.unwrap();
        f.tracker
            .fill_horizon(&row.ticker, row.analyzed_date, row.trigger, 7, dec!(106))
            .await
            .unwrap();
    }

    let (delta, reasons) = f
        .memory
        .score_adjustment(&ticker, "Retail", TriggerKind::VolumeSurge)
        .await
        .unwrap();
    assert_eq!(delta, 1);
    assert!(!reasons.is_empty());
    assert!((-3..=3).contains(&delta));
}
