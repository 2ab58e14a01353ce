//! End-to-end screener scenarios over mock market data.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sagetrade::application::screener::Screener;
use sagetrade::config::ScreenerConfig;
use sagetrade::domain::market::snapshot::Snapshot;
use sagetrade::domain::market::ticker::{Realm, Ticker};
use sagetrade::domain::trading::trigger::{SessionMode, TriggerKind};
use sagetrade::infrastructure::mock::MockMarketData;
use std::collections::HashMap;
use std::sync::Arc;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn prev_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 30).unwrap()
}

#[allow(clippy::too_many_arguments)]
fn snap(
    code: &str,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    prev_close: Decimal,
    volume: u64,
    traded_value: Decimal,
    market_cap: Decimal,
) -> (Ticker, Snapshot) {
    let ticker = Ticker::us(code);
    (
        ticker.clone(),
        Snapshot {
            ticker,
            trading_day: day(),
            open,
            high,
            low,
            close,
            prev_close,
            volume,
            traded_value,
            market_cap,
        },
    )
}

/// Previous-day row controlling the volume ratio.
fn prev_snap(code: &str, volume: u64) -> (Ticker, Snapshot) {
    let (ticker, mut snapshot) = snap(
        code,
        dec!(100),
        dec!(101),
        dec!(99),
        dec!(100),
        dec!(100),
        volume,
        dec!(500_000_000),
        dec!(400_000_000_000),
    );
    snapshot.trading_day = prev_day();
    (ticker, snapshot)
}

fn screener(provider: Arc<MockMarketData>) -> Screener {
    Screener::new(provider, ScreenerConfig::from_env())
}

#[tokio::test]
async fn test_morning_volume_surge_single_candidate() {
    // One ticker, ratio 11.67, up day, deep liquidity: the worked example.
    let mut provider = MockMarketData::new(Realm::Us);
    let snapshot: HashMap<_, _> = [snap(
        "WMT",
        dec!(119.50),
        dec!(120.10),
        dec!(118.90),
        dec!(119.70),
        dec!(118.80),
        17_500_000,
        dec!(2_000_000_000),
        dec!(400_000_000_000),
    )]
    .into_iter()
    .collect();
    let prev: HashMap<_, _> = [prev_snap("WMT", 1_500_000)].into_iter().collect();
    provider.snapshots.insert(day(), snapshot.clone());
    provider.snapshots.insert(prev_day(), prev.clone());

    let screener = screener(Arc::new(provider));
    let result = screener
        .run(SessionMode::Morning, day(), &snapshot, &prev)
        .await
        .unwrap();

    let (_, surge) = result
        .ranked
        .iter()
        .find(|(t, _)| *t == TriggerKind::VolumeSurge)
        .expect("volume surge ranked");
    assert_eq!(surge.len(), 1);
    let top = &surge[0];
    assert_eq!(top.ticker().code, "WMT");
    assert_eq!(top.levels.stop_loss_price, dec!(113.71));
    assert_eq!(top.levels.target_price, dec!(137.65));
    assert!((top.levels.risk_reward - 3.0).abs() < 0.02);
    assert!((top.final_score - 1.0).abs() < 1e-9);

    assert_eq!(result.selected.len(), 1);
    assert_eq!(result.selected[0].ticker().code, "WMT");
}

#[tokio::test]
async fn test_gap_up_ordering_across_multiple_hits() {
    // Identical volume/value so the gap alone decides the order.
    let mut provider = MockMarketData::new(Realm::Us);
    let rows = [
        ("AVGO", dec!(101.87), dec!(102.80)),
        ("NEE", dec!(101.54), dec!(102.40)),
        ("AMZN", dec!(101.21), dec!(102.10)),
    ];
    let snapshot: HashMap<_, _> = rows
        .iter()
        .map(|(code, open, close)| {
            snap(
                code,
                *open,
                *close + dec!(0.5),
                *open - dec!(0.5),
                *close,
                dec!(100.00),
                5_000_000,
                dec!(600_000_000),
                dec!(300_000_000_000),
            )
        })
        .collect();
    let prev: HashMap<_, _> = rows
        .iter()
        .map(|(code, _, _)| prev_snap(code, 5_000_000))
        .collect();
    provider.snapshots.insert(day(), snapshot.clone());
    provider.snapshots.insert(prev_day(), prev.clone());

    let screener = screener(Arc::new(provider));
    let result = screener
        .run(SessionMode::Morning, day(), &snapshot, &prev)
        .await
        .unwrap();

    let (_, gap) = result
        .ranked
        .iter()
        .find(|(t, _)| *t == TriggerKind::GapUpMomentum)
        .expect("gap up ranked");
    let order: Vec<&str> = gap.iter().map(|c| c.ticker().code.as_str()).collect();
    assert_eq!(order, vec!["AVGO", "NEE", "AMZN"]);
}

#[tokio::test]
async fn test_cross_trigger_dedup_and_backfill() {
    // WMT fires volume surge and also leads value-to-cap; the dedup must
    // give value-to-cap's slot to the next candidate and backfill the rest.
    let mut provider = MockMarketData::new(Realm::Us);
    let snapshot: HashMap<_, _> = [
        // WMT: huge ratio, largest value-to-cap
        snap(
            "WMT",
            dec!(100.00),
            dec!(101.80),
            dec!(99.80),
            dec!(101.00),
            dec!(100.00),
            20_000_000,
            dec!(2_000_000_000),
            dec!(40_000_000_000),
        ),
        // MSFT: mid value-to-cap
        snap(
            "MSFT",
            dec!(200.00),
            dec!(203.60),
            dec!(199.60),
            dec!(202.00),
            dec!(200.00),
            10_000_000,
            dec!(2_000_000_000),
            dec!(66_666_000_000),
        ),
        // AVGO: smallest value-to-cap
        snap(
            "AVGO",
            dec!(300.00),
            dec!(305.40),
            dec!(299.40),
            dec!(303.00),
            dec!(300.00),
            10_000_000,
            dec!(2_000_000_000),
            dec!(200_000_000_000),
        ),
    ]
    .into_iter()
    .collect();
    let prev: HashMap<_, _> = [
        prev_snap("WMT", 1_800_000),
        prev_snap("MSFT", 10_000_000),
        prev_snap("AVGO", 10_000_000),
    ]
    .into_iter()
    .collect();
    provider.snapshots.insert(day(), snapshot.clone());
    provider.snapshots.insert(prev_day(), prev.clone());

    let screener = screener(Arc::new(provider));
    let result = screener
        .run(SessionMode::Morning, day(), &snapshot, &prev)
        .await
        .unwrap();

    let codes: Vec<&str> = result
        .selected
        .iter()
        .map(|c| c.ticker().code.as_str())
        .collect();
    assert_eq!(codes.len(), 3);
    assert_eq!(codes[0], "WMT");
    assert_eq!(codes[1], "MSFT");
    assert!(codes.contains(&"AVGO"));

    // All distinct
    let unique: std::collections::HashSet<_> = codes.iter().collect();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn test_screening_is_deterministic() {
    let mut provider = MockMarketData::new(Realm::Us);
    let snapshot: HashMap<_, _> = [
        snap(
            "WMT",
            dec!(119.50),
            dec!(120.10),
            dec!(118.90),
            dec!(119.70),
            dec!(118.80),
            17_500_000,
            dec!(2_000_000_000),
            dec!(400_000_000_000),
        ),
        snap(
            "MSFT",
            dec!(200.00),
            dec!(203.60),
            dec!(199.60),
            dec!(202.00),
            dec!(200.00),
            10_000_000,
            dec!(2_000_000_000),
            dec!(66_666_000_000),
        ),
    ]
    .into_iter()
    .collect();
    let prev: HashMap<_, _> = [prev_snap("WMT", 1_500_000), prev_snap("MSFT", 9_000_000)]
        .into_iter()
        .collect();
    provider.snapshots.insert(day(), snapshot.clone());
    provider.snapshots.insert(prev_day(), prev.clone());

    let screener = screener(Arc::new(provider));
    let a = screener
        .run(SessionMode::Morning, day(), &snapshot, &prev)
        .await
        .unwrap();
    let b = screener
        .run(SessionMode::Morning, day(), &snapshot, &prev)
        .await
        .unwrap();

    let codes = |r: &sagetrade::application::screener::ScreenResult| {
        r.selected
            .iter()
            .map(|c| (c.ticker().clone(), c.final_score))
            .collect::<Vec<_>>()
    };
    assert_eq!(codes(&a), codes(&b));
}

#[tokio::test]
async fn test_empty_market_selects_nothing() {
    let provider = MockMarketData::new(Realm::Us);
    let screener = screener(Arc::new(provider));
    let result = screener
        .run(SessionMode::Morning, day(), &HashMap::new(), &HashMap::new())
        .await
        .unwrap();
    assert!(result.selected.is_empty());
    assert!(result.ranked.is_empty());
}

#[tokio::test]
async fn test_afternoon_triggers_fire_in_afternoon_session() {
    // +5% on heavy volume with a strong close: intraday rise and closing
    // strength both fire; morning triggers must not appear.
    let mut provider = MockMarketData::new(Realm::Us);
    let snapshot: HashMap<_, _> = [snap(
        "NVDA",
        dec!(100.00),
        dec!(105.50),
        dec!(99.80),
        dec!(105.20),
        dec!(100.00),
        30_000_000,
        dec!(3_000_000_000),
        dec!(900_000_000_000),
    )]
    .into_iter()
    .collect();
    let prev: HashMap<_, _> = [prev_snap("NVDA", 10_000_000)].into_iter().collect();
    provider.snapshots.insert(day(), snapshot.clone());
    provider.snapshots.insert(prev_day(), prev.clone());

    let screener = screener(Arc::new(provider));
    let result = screener
        .run(SessionMode::Afternoon, day(), &snapshot, &prev)
        .await
        .unwrap();

    assert!(
        result
            .ranked
            .iter()
            .any(|(t, _)| *t == TriggerKind::IntradayRise)
    );
    assert!(
        result
            .ranked
            .iter()
            .all(|(t, _)| t.session() == SessionMode::Afternoon)
    );
    assert_eq!(result.selected[0].ticker().code, "NVDA");
}
