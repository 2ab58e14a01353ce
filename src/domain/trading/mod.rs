// Trading domain: scenarios, holdings, trades, portfolio invariants
pub mod portfolio;
pub mod scenario;
pub mod trigger;
pub mod types;

pub use portfolio::{MAX_HOLDINGS, MAX_PER_SECTOR, MAX_SECTOR_WEIGHT, Portfolio};
pub use scenario::{InvestmentPeriod, Scenario};
pub use trigger::{SessionMode, TriggerKind};
pub use types::{Holding, SellReason, Trade, TradeSignal, WatchlistEntry};
