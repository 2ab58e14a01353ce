//! Trading-memory retention and compression policy.

use std::env;

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Journals older than this are promoted from layer 1 to layer 2, days.
    pub layer1_age_days: i64,
    /// Journals older than this are promoted from layer 2 to layer 3, days.
    pub layer2_age_days: i64,
    /// Layer-3 journals older than this are deleted by cleanup, days.
    pub archive_days: i64,
    /// Knowledge with fewer supporting trades than this, past stale_days,
    /// gets deactivated.
    pub min_supporting_trades: u32,
    pub stale_days: i64,
    pub max_principles: usize,
    pub max_intuitions: usize,
}

impl MemoryConfig {
    pub fn from_env() -> Self {
        Self {
            layer1_age_days: parse_env("MEMORY_LAYER1_AGE_DAYS", 7),
            layer2_age_days: parse_env("MEMORY_LAYER2_AGE_DAYS", 30),
            archive_days: parse_env("MEMORY_ARCHIVE_DAYS", 180),
            min_supporting_trades: parse_env("MEMORY_MIN_SUPPORTING_TRADES", 2) as u32,
            stale_days: parse_env("MEMORY_STALE_DAYS", 60),
            max_principles: parse_env("MEMORY_MAX_PRINCIPLES", 20) as usize,
            max_intuitions: parse_env("MEMORY_MAX_INTUITIONS", 30) as usize,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_env(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
