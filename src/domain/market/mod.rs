// Market data domain: realms, instruments, snapshots, bars, regime
pub mod candle;
pub mod regime;
pub mod snapshot;
pub mod ticker;

pub use candle::{CompanyMeta, DailyBar, HolderRow};
pub use regime::{Regime, RegimeDetector};
pub use snapshot::Snapshot;
pub use ticker::{Currency, Realm, Ticker};
