//! Trigger predicates and composite scoring over a session snapshot.

use crate::application::screener::scoring::norm;
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::Ticker;
use crate::domain::trading::trigger::TriggerKind;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::HashMap;

/// Closing strength above this counts as "closed near the high".
const CLOSING_STRENGTH_FLOOR: f64 = 0.7;

/// One instrument as the screener sees it: the day's snapshot enriched with
/// the previous-day volume ratio.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub snapshot: Snapshot,
    /// Today's volume over yesterday's; 0.0 when yesterday is unknown.
    pub volume_ratio: f64,
}

impl Candidate {
    pub fn ticker(&self) -> &Ticker {
        &self.snapshot.ticker
    }
}

/// A candidate that passed one trigger's predicate, with its composite
/// score and the raw metrics that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerHit {
    pub trigger: TriggerKind,
    pub ticker: Ticker,
    pub trading_day: NaiveDate,
    pub composite_score: f64,
    pub metrics: HashMap<String, f64>,
}

fn passes(trigger: TriggerKind, c: &Candidate) -> bool {
    let s = &c.snapshot;
    match trigger {
        TriggerKind::VolumeSurge => c.volume_ratio >= 1.3 && s.is_up_day(),
        TriggerKind::GapUpMomentum => s.gap_rate() >= 0.01 && s.is_up_day(),
        TriggerKind::ValueToCap => s.is_up_day(),
        TriggerKind::IntradayRise => {
            let chg = s.change_rate();
            (0.03..=0.20).contains(&chg)
        }
        TriggerKind::ClosingStrength => {
            s.closing_strength() >= CLOSING_STRENGTH_FLOOR
                && c.volume_ratio > 1.0
                && s.is_up_day()
        }
        TriggerKind::VolumeSurgeSideways => {
            c.volume_ratio >= 1.5 && s.change_rate().abs() <= 0.05
        }
    }
}

/// `(metric_name, weight, extractor)` triples defining one composite score.
type MetricSpec = (&'static str, f64, fn(&Candidate) -> f64);

fn metric_specs(trigger: TriggerKind) -> &'static [MetricSpec] {
    fn volume(c: &Candidate) -> f64 {
        c.snapshot.volume as f64
    }
    fn volume_ratio(c: &Candidate) -> f64 {
        c.volume_ratio
    }
    fn traded_value(c: &Candidate) -> f64 {
        c.snapshot.traded_value.to_f64().unwrap_or(0.0)
    }
    fn gap_rate(c: &Candidate) -> f64 {
        c.snapshot.gap_rate()
    }
    fn intraday_rate(c: &Candidate) -> f64 {
        c.snapshot.intraday_rate()
    }
    fn change_rate(c: &Candidate) -> f64 {
        c.snapshot.change_rate()
    }
    fn value_to_cap(c: &Candidate) -> f64 {
        c.snapshot.value_to_cap_ratio()
    }
    fn closing_strength(c: &Candidate) -> f64 {
        c.snapshot.closing_strength()
    }

    match trigger {
        TriggerKind::VolumeSurge => &[
            ("volume_ratio", 0.6, volume_ratio),
            ("volume", 0.4, volume),
        ],
        TriggerKind::GapUpMomentum => &[
            ("gap_rate", 0.5, gap_rate),
            ("intraday_rate", 0.3, intraday_rate),
            ("traded_value", 0.2, traded_value),
        ],
        TriggerKind::ValueToCap => &[
            ("value_to_cap_ratio", 0.5, value_to_cap),
            ("traded_value", 0.3, traded_value),
            ("intraday_rate", 0.2, intraday_rate),
        ],
        TriggerKind::IntradayRise => &[
            ("change_rate", 0.6, change_rate),
            ("traded_value", 0.4, traded_value),
        ],
        TriggerKind::ClosingStrength => &[
            ("closing_strength", 0.5, closing_strength),
            ("volume_ratio", 0.3, volume_ratio),
            ("traded_value", 0.2, traded_value),
        ],
        TriggerKind::VolumeSurgeSideways => &[
            ("volume_ratio", 0.6, volume_ratio),
            ("traded_value", 0.4, traded_value),
        ],
    }
}

/// Evaluate one trigger over the candidate pool: filter by predicate, then
/// score with min-max-normalized weighted metrics over the matched set.
/// Hits come back ordered by composite score, best first.
pub fn evaluate(trigger: TriggerKind, pool: &[Candidate]) -> Vec<TriggerHit> {
    let matched: Vec<&Candidate> = pool.iter().filter(|c| passes(trigger, c)).collect();
    if matched.is_empty() {
        return Vec::new();
    }

    let specs = metric_specs(trigger);
    let mut composites = vec![0.0; matched.len()];
    let mut raw_metrics: Vec<HashMap<String, f64>> =
        vec![HashMap::with_capacity(specs.len()); matched.len()];

    for (name, weight, extract) in specs {
        let raw: Vec<f64> = matched.iter().map(|c| extract(c)).collect();
        let normalized = norm(&raw);
        for i in 0..matched.len() {
            composites[i] += weight * normalized[i];
            raw_metrics[i].insert((*name).to_string(), raw[i]);
        }
    }

    let mut hits: Vec<TriggerHit> = matched
        .iter()
        .zip(composites)
        .zip(raw_metrics)
        .map(|((c, composite_score), metrics)| TriggerHit {
            trigger,
            ticker: c.ticker().clone(),
            trading_day: c.snapshot.trading_day,
            composite_score,
            metrics,
        })
        .collect();

    hits.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}
