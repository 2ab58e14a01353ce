use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which scheduled run of the pipeline a trigger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    Morning,
    Afternoon,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Morning => write!(f, "morning"),
            SessionMode::Afternoon => write!(f, "afternoon"),
        }
    }
}

impl FromStr for SessionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morning" => Ok(SessionMode::Morning),
            "afternoon" => Ok(SessionMode::Afternoon),
            _ => anyhow::bail!("Invalid session mode: {}. Must be 'morning' or 'afternoon'", s),
        }
    }
}

/// A named statistical selection trigger. The predicate and scoring live in
/// the screener; the kind itself is shared vocabulary across the pipeline,
/// the decision layer and the trading memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    VolumeSurge,
    GapUpMomentum,
    ValueToCap,
    IntradayRise,
    ClosingStrength,
    VolumeSurgeSideways,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 6] = [
        TriggerKind::VolumeSurge,
        TriggerKind::GapUpMomentum,
        TriggerKind::ValueToCap,
        TriggerKind::IntradayRise,
        TriggerKind::ClosingStrength,
        TriggerKind::VolumeSurgeSideways,
    ];

    pub fn session(&self) -> SessionMode {
        match self {
            TriggerKind::VolumeSurge | TriggerKind::GapUpMomentum | TriggerKind::ValueToCap => {
                SessionMode::Morning
            }
            TriggerKind::IntradayRise
            | TriggerKind::ClosingStrength
            | TriggerKind::VolumeSurgeSideways => SessionMode::Afternoon,
        }
    }

    pub fn for_session(session: SessionMode) -> Vec<TriggerKind> {
        Self::ALL
            .iter()
            .copied()
            .filter(|t| t.session() == session)
            .collect()
    }

    /// Maximum stop-loss distance from entry, as a fraction of entry.
    /// Momentum-style entries use the tighter 5% stop; accumulation-style
    /// entries get 7% of room.
    pub fn sl_max(&self) -> f64 {
        match self {
            TriggerKind::VolumeSurge
            | TriggerKind::GapUpMomentum
            | TriggerKind::ClosingStrength => 0.05,
            TriggerKind::ValueToCap
            | TriggerKind::IntradayRise
            | TriggerKind::VolumeSurgeSideways => 0.07,
        }
    }

    /// Minimum acceptable risk/reward ratio for a scenario built on this
    /// trigger.
    pub fn rr_target(&self) -> f64 {
        match self {
            TriggerKind::VolumeSurge
            | TriggerKind::GapUpMomentum
            | TriggerKind::ClosingStrength => 2.0,
            TriggerKind::ValueToCap
            | TriggerKind::IntradayRise
            | TriggerKind::VolumeSurgeSideways => 1.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::VolumeSurge => "volume_surge",
            TriggerKind::GapUpMomentum => "gap_up_momentum",
            TriggerKind::ValueToCap => "value_to_cap",
            TriggerKind::IntradayRise => "intraday_rise",
            TriggerKind::ClosingStrength => "closing_strength",
            TriggerKind::VolumeSurgeSideways => "volume_surge_sideways",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown trigger: {}", s))
    }
}
