//! Final composite scoring and shortlist selection.

use crate::application::screener::scoring::{FitLevels, norm};
use crate::application::screener::triggers::TriggerHit;
use crate::domain::market::ticker::Ticker;
use crate::domain::trading::trigger::TriggerKind;
use serde::Serialize;
use std::collections::HashSet;

/// A trigger hit that survived the agent-fit pass, carrying its price
/// levels and final composite.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub hit: TriggerHit,
    pub levels: FitLevels,
    /// `0.3 * norm(composite) + 0.7 * agent_fit` over the trigger's scored
    /// set.
    pub final_score: f64,
}

impl ScoredCandidate {
    pub fn ticker(&self) -> &Ticker {
        &self.hit.ticker
    }
}

/// Attach final scores to one trigger's fitted candidates and order them
/// best-first. The composite is re-normalized over the scored subset only:
/// candidates dropped during the fit pass no longer influence ranking.
pub fn finalize_trigger(mut fitted: Vec<(TriggerHit, FitLevels)>) -> Vec<ScoredCandidate> {
    let composites: Vec<f64> = fitted.iter().map(|(h, _)| h.composite_score).collect();
    let normalized = norm(&composites);

    let mut scored: Vec<ScoredCandidate> = fitted
        .drain(..)
        .zip(normalized)
        .map(|((hit, levels), n)| {
            let final_score = 0.3 * n + 0.7 * levels.agent_fit;
            ScoredCandidate {
                hit,
                levels,
                final_score,
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

/// Merge per-trigger rankings into the final shortlist.
///
/// Pass one takes each trigger's best not-yet-selected ticker, in trigger
/// declaration order (first occurrence wins on duplicates). Pass two
/// backfills from the remaining candidates across all triggers, best final
/// score first, until `limit` tickers or exhaustion.
pub fn select(
    ranked: &[(TriggerKind, Vec<ScoredCandidate>)],
    limit: usize,
) -> Vec<ScoredCandidate> {
    let mut chosen: Vec<ScoredCandidate> = Vec::with_capacity(limit);
    let mut seen: HashSet<Ticker> = HashSet::new();

    for (_, candidates) in ranked {
        if chosen.len() >= limit {
            break;
        }
        if let Some(best) = candidates.iter().find(|c| !seen.contains(c.ticker())) {
            seen.insert(best.ticker().clone());
            chosen.push(best.clone());
        }
    }

    if chosen.len() < limit {
        let mut leftovers: Vec<&ScoredCandidate> = ranked
            .iter()
            .flat_map(|(_, cs)| cs.iter())
            .filter(|c| !seen.contains(c.ticker()))
            .collect();
        leftovers.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for c in leftovers {
            if chosen.len() >= limit {
                break;
            }
            if seen.insert(c.ticker().clone()) {
                chosen.push(c.clone());
            }
        }
    }

    chosen
}
