mod holdings_repository;
mod journal_repository;
mod knowledge_repository;
mod tracker_repository;
mod trades_repository;

pub use holdings_repository::SqliteHoldingRepository;
pub use journal_repository::SqliteJournalRepository;
pub use knowledge_repository::SqliteKnowledgeRepository;
pub use tracker_repository::SqliteTrackerRepository;
pub use trades_repository::{SqliteTradeRepository, SqliteWatchlistRepository};
