//! Broker adapter configuration. Absent credentials mean the paper broker
//! fills everything internally at the quoted price.

use crate::domain::ports::TradeMode;
use std::env;

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub mode: TradeMode,
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

impl BrokerConfig {
    pub fn from_env() -> Self {
        let mode = match env::var("BROKER_MODE").as_deref() {
            Ok("real") => TradeMode::Real,
            _ => TradeMode::Demo,
        };
        Self {
            mode,
            api_key: env::var("BROKER_API_KEY").unwrap_or_default(),
            api_secret: env::var("BROKER_API_SECRET").unwrap_or_default(),
            base_url: env::var("BROKER_BASE_URL").unwrap_or_default(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}
