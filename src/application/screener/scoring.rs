//! Min-max normalization and the agent-fit scoring pass.

use crate::domain::market::candle::DailyBar;
use crate::domain::market::ticker::Realm;
use crate::domain::trading::trigger::TriggerKind;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;

/// Min-max normalize a metric over the candidate set.
///
/// Empty input yields nothing; a lone candidate normalizes to 1.0; a larger
/// constant set (max == min) normalizes to 0.0 for every member since the
/// metric carries no ranking information there.
pub fn norm(values: &[f64]) -> Vec<f64> {
    match values.len() {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let range = max - min;
            if range <= f64::EPSILON {
                return vec![0.0; values.len()];
            }
            values.iter().map(|v| (v - min) / range).collect()
        }
    }
}

/// Price levels and risk/reward computed for one candidate during the
/// agent-fit pass.
#[derive(Debug, Clone, Serialize)]
pub struct FitLevels {
    pub current_price: Decimal,
    pub stop_loss_price: Decimal,
    pub target_price: Decimal,
    pub risk_reward: f64,
    pub agent_fit: f64,
}

/// Fixed-percentage stop, window-high target floored at +15%, and the
/// resulting risk/reward scored against the trigger's target ratio.
pub fn compute_fit_levels(
    trigger: TriggerKind,
    realm: Realm,
    current_price: Decimal,
    window: &[DailyBar],
    target_floor_ratio: Decimal,
) -> Option<FitLevels> {
    if current_price <= Decimal::ZERO {
        return None;
    }

    let scale = realm.price_scale();
    let sl_factor = Decimal::from_f64(1.0 - trigger.sl_max())?;
    let stop_loss_price = (current_price * sl_factor).trunc_with_scale(scale);

    let window_high = window
        .iter()
        .map(|b| b.high)
        .max()
        .unwrap_or(Decimal::ZERO);
    let floor = (current_price * target_floor_ratio).trunc_with_scale(scale);
    let target_price = window_high.trunc_with_scale(scale).max(floor);

    let risk = current_price - stop_loss_price;
    if risk <= Decimal::ZERO {
        return None;
    }
    let risk_reward = ((target_price - current_price) / risk).to_f64()?;

    let rr_score = (risk_reward / trigger.rr_target()).min(1.0);
    // The stop is imposed by policy rather than proposed, so it always
    // scores full marks; the fit hinges on achievable reward.
    let sl_score = 1.0;
    let agent_fit = 0.6 * rr_score + 0.4 * sl_score;

    Some(FitLevels {
        current_price,
        stop_loss_price,
        target_price,
        risk_reward,
        agent_fit,
    })
}
