//! Regime-adaptive acceptance gates for new entries.

use crate::domain::market::regime::Regime;
use crate::domain::trading::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    pub min_buy_score: u8,
    pub min_risk_reward: f64,
    pub max_stop_distance: f64,
}

/// Bull markets accept more; bear and sideways markets demand a stronger
/// setup and a tighter stop.
pub fn thresholds_for(regime: Regime) -> GateThresholds {
    match regime {
        Regime::Bull => GateThresholds {
            min_buy_score: 6,
            min_risk_reward: 1.5,
            max_stop_distance: 0.10,
        },
        Regime::Bear | Regime::Sideways => GateThresholds {
            min_buy_score: 7,
            min_risk_reward: 2.0,
            max_stop_distance: 0.07,
        },
    }
}

/// Check an adjusted score and scenario against the regime gate. Returns
/// the human-readable rejection reason, or None when the entry passes.
pub fn rejection_reason(
    scenario: &Scenario,
    effective_score: u8,
    regime: Regime,
) -> Option<String> {
    let gate = thresholds_for(regime);

    if effective_score < gate.min_buy_score {
        return Some(format!(
            "buy score {} below {} gate ({} regime)",
            effective_score, gate.min_buy_score, regime
        ));
    }

    let rr = scenario.risk_reward();
    if rr + 1e-9 < gate.min_risk_reward {
        return Some(format!(
            "risk/reward {:.2} below {:.1} gate ({} regime)",
            rr, gate.min_risk_reward, regime
        ));
    }

    let stop = scenario.stop_distance();
    if stop > gate.max_stop_distance + 1e-9 {
        return Some(format!(
            "stop distance {:.1}% beyond {:.0}% gate ({} regime)",
            stop * 100.0,
            gate.max_stop_distance * 100.0,
            regime
        ));
    }

    None
}
