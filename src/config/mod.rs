//! Configuration module for Sagetrade.
//!
//! Structured configuration loading from environment variables, organized
//! by domain: LLM, Messaging, Broker, Screener, Memory and Trading.

mod broker_config;
mod llm_config;
mod memory_config;
mod messaging_config;
mod screener_config;

pub use broker_config::BrokerConfig;
pub use llm_config::LlmConfig;
pub use memory_config::MemoryConfig;
pub use messaging_config::MessagingConfig;
pub use screener_config::ScreenerConfig;

use crate::domain::market::ticker::Realm;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use url::Url;

/// Capital sizing per realm. Each entry is sized so ten equal positions
/// fill the book.
#[derive(Debug, Clone)]
pub struct TradingConfig {
    pub capital_base_kr: Decimal,
    pub capital_base_us: Decimal,
}

impl TradingConfig {
    pub fn from_env() -> Self {
        Self {
            capital_base_kr: parse_decimal("CAPITAL_BASE_KR", dec!(100_000_000)),
            capital_base_us: parse_decimal("CAPITAL_BASE_US", dec!(100_000)),
        }
    }

    pub fn capital_base(&self, realm: Realm) -> Decimal {
        match realm {
            Realm::Kr => self.capital_base_kr,
            Realm::Us => self.capital_base_us,
        }
    }

    /// One position = one tenth of the book.
    pub fn position_size(&self, realm: Realm) -> Decimal {
        self.capital_base(realm) / dec!(10)
    }
}

/// Main application configuration, aggregated from the per-domain modules.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub messaging: MessagingConfig,
    pub broker: BrokerConfig,
    pub screener: ScreenerConfig,
    pub memory: MemoryConfig,
    pub trading: TradingConfig,

    pub database_url: String,
    pub artifacts_dir: String,
    pub default_realm: Realm,
    pub default_language: String,
    /// Base URLs for the realm data providers.
    pub kr_data_base_url: String,
    pub us_data_base_url: String,
    pub us_data_api_key: String,
    /// RSS feed polled for headlines fed to the news analysis.
    pub news_feed_url: String,
    pub market_data_timeout_secs: u64,
}

impl Config {
    /// Load and validate. A missing LLM key or a malformed endpoint URL is
    /// a configuration error and fails here, before any work starts.
    pub fn from_env() -> Result<Self> {
        let default_realm = match env::var("DEFAULT_REALM") {
            Ok(v) => Realm::from_str(&v)?,
            Err(_) => Realm::Kr,
        };

        let config = Self {
            llm: LlmConfig::from_env()?,
            messaging: MessagingConfig::from_env(),
            broker: BrokerConfig::from_env(),
            screener: ScreenerConfig::from_env(),
            memory: MemoryConfig::from_env(),
            trading: TradingConfig::from_env(),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/sagetrade.db".to_string()),
            artifacts_dir: env::var("ARTIFACTS_DIR").unwrap_or_else(|_| "artifacts".to_string()),
            default_realm,
            default_language: env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            kr_data_base_url: env::var("KR_DATA_BASE_URL")
                .unwrap_or_else(|_| "https://data-api.krx.co.kr".to_string()),
            us_data_base_url: env::var("US_DATA_BASE_URL")
                .unwrap_or_else(|_| "https://data.alpaca.markets".to_string()),
            us_data_api_key: env::var("US_DATA_API_KEY").unwrap_or_default(),
            news_feed_url: env::var("NEWS_FEED_URL")
                .unwrap_or_else(|_| "https://feeds.finance.yahoo.com/rss/2.0/headline".to_string()),
            market_data_timeout_secs: env::var("MARKET_DATA_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        };

        for (name, value) in [
            ("LLM_BASE_URL", &config.llm.base_url),
            ("KR_DATA_BASE_URL", &config.kr_data_base_url),
            ("US_DATA_BASE_URL", &config.us_data_base_url),
            ("NEWS_FEED_URL", &config.news_feed_url),
        ] {
            Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", name, value))?;
        }

        Ok(config)
    }
}

fn parse_decimal(key: &str, default: Decimal) -> Decimal {
    env::var(key)
        .ok()
        .and_then(|v| Decimal::from_str(&v).ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_size_is_tenth_of_base() {
        let trading = TradingConfig {
            capital_base_kr: dec!(100_000_000),
            capital_base_us: dec!(100_000),
        };
        assert_eq!(trading.position_size(Realm::Kr), dec!(10_000_000));
        assert_eq!(trading.position_size(Realm::Us), dec!(10_000));
    }
}
