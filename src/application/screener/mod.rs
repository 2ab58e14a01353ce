//! Per-session triggered selection of at most three tickers.
//!
//! Pipeline: absolute filters → liquidity tail cut → per-trigger predicate
//! and composite scoring → agent-fit pass over each trigger's top slice →
//! final composite → cross-trigger selection with dedup and backfill.

pub mod scoring;
pub mod selector;
pub mod triggers;

pub use selector::ScoredCandidate;
pub use triggers::{Candidate, TriggerHit};

use crate::config::ScreenerConfig;
use crate::domain::market::snapshot::Snapshot;
use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::ports::MarketDataProvider;
use crate::domain::trading::trigger::{SessionMode, TriggerKind};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one screening run produced, for the session alert, the
/// `screen` CLI command and the tests.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenResult {
    pub realm: Realm,
    pub session: SessionMode,
    pub trading_day: NaiveDate,
    /// Per-trigger rankings, best first, in trigger declaration order.
    pub ranked: Vec<(TriggerKind, Vec<ScoredCandidate>)>,
    /// The final shortlist, at most three distinct tickers.
    pub selected: Vec<ScoredCandidate>,
}

pub struct Screener {
    provider: Arc<dyn MarketDataProvider>,
    config: ScreenerConfig,
}

impl Screener {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: ScreenerConfig) -> Self {
        Self { provider, config }
    }

    /// Run one screening pass over a prepared pair of snapshots.
    ///
    /// A trigger with zero candidates contributes nothing; an upstream
    /// failure while fitting one trigger's candidates isolates to that
    /// trigger. An empty shortlist is a valid terminal outcome.
    pub async fn run(
        &self,
        session: SessionMode,
        trading_day: NaiveDate,
        snapshot: &HashMap<Ticker, Snapshot>,
        prev_snapshot: &HashMap<Ticker, Snapshot>,
    ) -> Result<ScreenResult> {
        let realm = self.provider.realm();
        let pool = self.build_pool(realm, snapshot, prev_snapshot);
        info!(
            "Screening {} {}: {} candidates after filters (universe {})",
            realm,
            session,
            pool.len(),
            snapshot.len()
        );

        let mut ranked = Vec::new();
        for trigger in TriggerKind::for_session(session) {
            let hits = triggers::evaluate(trigger, &pool);
            debug!("{}: {} raw hits", trigger, hits.len());

            let top = hits.into_iter().take(self.config.agent_fit_depth);
            let mut fitted = Vec::new();
            for hit in top {
                match self.fit(trigger, trading_day, &hit, snapshot).await {
                    Some(levels) => fitted.push((hit, levels)),
                    None => continue,
                }
            }

            let scored = selector::finalize_trigger(fitted);
            if !scored.is_empty() {
                ranked.push((trigger, scored));
            }
        }

        let selected = selector::select(&ranked, self.config.max_selected);
        info!(
            "Selected {}: [{}]",
            selected.len(),
            selected
                .iter()
                .map(|c| c.ticker().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(ScreenResult {
            realm,
            session,
            trading_day,
            ranked,
            selected,
        })
    }

    /// Absolute filters and the liquidity tail cut.
    fn build_pool(
        &self,
        realm: Realm,
        snapshot: &HashMap<Ticker, Snapshot>,
        prev_snapshot: &HashMap<Ticker, Snapshot>,
    ) -> Vec<Candidate> {
        if snapshot.is_empty() {
            return Vec::new();
        }

        let mean_volume =
            snapshot.values().map(|s| s.volume as f64).sum::<f64>() / snapshot.len() as f64;
        let min_value = self.config.min_traded_value(realm);
        let min_cap = self.config.min_market_cap(realm);

        let mut pool: Vec<Candidate> = snapshot
            .values()
            .filter(|s| {
                s.traded_value >= min_value
                    && s.market_cap >= min_cap
                    && s.volume as f64 >= self.config.min_volume_vs_mean * mean_volume
                    && s.change_rate().abs() <= self.config.max_abs_change_rate
            })
            .map(|s| {
                let volume_ratio = prev_snapshot
                    .get(&s.ticker)
                    .filter(|p| p.volume > 0)
                    .map(|p| s.volume as f64 / p.volume as f64)
                    .unwrap_or(0.0);
                Candidate {
                    snapshot: s.clone(),
                    volume_ratio,
                }
            })
            .collect();

        // Drop the bottom slice by volume
        pool.sort_by(|a, b| b.snapshot.volume.cmp(&a.snapshot.volume));
        let keep = pool.len() - (pool.len() as f64 * self.config.liquidity_tail_pct) as usize;
        pool.truncate(keep);
        pool
    }

    /// Fetch the fit window and compute levels for one hit. Returns None on
    /// upstream failure or degenerate prices; the candidate is skipped.
    async fn fit(
        &self,
        trigger: TriggerKind,
        trading_day: NaiveDate,
        hit: &TriggerHit,
        snapshot: &HashMap<Ticker, Snapshot>,
    ) -> Option<scoring::FitLevels> {
        let current_price = snapshot.get(&hit.ticker)?.close;
        let start = trading_day - chrono::Days::new(self.config.fit_window_days as u64 * 2);
        let window = match self
            .provider
            .ohlcv(&hit.ticker, start, trading_day)
            .await
        {
            Ok(bars) => {
                let skip = bars.len().saturating_sub(self.config.fit_window_days as usize);
                bars.into_iter().skip(skip).collect::<Vec<_>>()
            }
            Err(e) => {
                warn!("Fit window fetch failed for {}: {}", hit.ticker, e);
                return None;
            }
        };

        scoring::compute_fit_levels(
            trigger,
            self.provider.realm(),
            current_price,
            &window,
            self.config.target_floor_ratio,
        )
    }
}
