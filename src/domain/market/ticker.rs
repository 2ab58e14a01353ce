use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A market jurisdiction with its own calendar, currency and data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Realm {
    Kr,
    Us,
}

impl Realm {
    pub fn timezone(&self) -> Tz {
        match self {
            Realm::Kr => chrono_tz::Asia::Seoul,
            Realm::Us => chrono_tz::America::New_York,
        }
    }

    pub fn currency(&self) -> Currency {
        match self {
            Realm::Kr => Currency::Krw,
            Realm::Us => Currency::Usd,
        }
    }

    /// Decimal places used when quoting prices in this realm.
    /// KRX quotes whole won; US venues quote cents.
    pub fn price_scale(&self) -> u32 {
        match self {
            Realm::Kr => 0,
            Realm::Us => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Kr => "KR",
            Realm::Us => "US",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Realm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kr" => Ok(Realm::Kr),
            "us" => Ok(Realm::Us),
            _ => anyhow::bail!("Invalid realm: {}. Must be 'kr' or 'us'", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Krw,
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Krw => write!(f, "KRW"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// Opaque instrument identifier, unique within a realm.
///
/// Codes are exchange-native: 6-digit numeric strings on KRX ("005930"),
/// alphabetic symbols on US venues ("WMT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticker {
    pub realm: Realm,
    pub code: String,
}

impl Ticker {
    pub fn new(realm: Realm, code: impl Into<String>) -> Self {
        Self {
            realm,
            code: code.into(),
        }
    }

    pub fn kr(code: impl Into<String>) -> Self {
        Self::new(Realm::Kr, code)
    }

    pub fn us(code: impl Into<String>) -> Self {
        Self::new(Realm::Us, code)
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.realm, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realm_parsing() {
        assert_eq!(Realm::from_str("kr").unwrap(), Realm::Kr);
        assert_eq!(Realm::from_str("US").unwrap(), Realm::Us);
        assert!(Realm::from_str("jp").is_err());
    }

    #[test]
    fn test_ticker_display() {
        assert_eq!(Ticker::kr("005930").to_string(), "KR:005930");
        assert_eq!(Ticker::us("WMT").to_string(), "US:WMT");
    }

    #[test]
    fn test_price_scale() {
        assert_eq!(Realm::Kr.price_scale(), 0);
        assert_eq!(Realm::Us.price_scale(), 2);
    }
}
