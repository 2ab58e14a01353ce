use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Connection pool plus schema bootstrap for the persistent store.
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists when the URL points at a file
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        // An in-memory database exists per connection; a pool of them
        // would each see their own empty schema.
        let max_connections = if db_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// In-memory database for tests.
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    /// Initialize database schema. Every shared table carries a `market`
    /// discriminator separating KR and US rows.
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS holdings (
                ticker TEXT NOT NULL,
                market TEXT NOT NULL,
                name TEXT NOT NULL,
                sector TEXT NOT NULL,
                buy_price TEXT NOT NULL,
                buy_date DATE NOT NULL,
                quantity TEXT NOT NULL,
                trigger_type TEXT NOT NULL,
                trigger_mode TEXT NOT NULL,
                scenario_json TEXT NOT NULL,
                scenario_history_json TEXT NOT NULL DEFAULT '[]',
                current_price TEXT NOT NULL,
                last_updated DATETIME NOT NULL,
                PRIMARY KEY (ticker, market)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create holdings table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                ticker TEXT NOT NULL,
                market TEXT NOT NULL,
                name TEXT NOT NULL,
                sector TEXT NOT NULL,
                buy_price TEXT NOT NULL,
                buy_date DATE NOT NULL,
                sell_price TEXT NOT NULL,
                sell_date DATE NOT NULL,
                quantity TEXT NOT NULL,
                sell_reason TEXT NOT NULL,
                profit_rate REAL NOT NULL,
                holding_days INTEGER NOT NULL,
                trigger_type TEXT NOT NULL,
                trigger_mode TEXT NOT NULL,
                scenario_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_ticker ON trades (ticker, market);
            CREATE INDEX IF NOT EXISTS idx_trades_sell_date ON trades (sell_date DESC);
            CREATE INDEX IF NOT EXISTS idx_trades_trigger ON trades (trigger_type);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create trades table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watchlist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                market TEXT NOT NULL,
                analyzed_date DATE NOT NULL,
                buy_score INTEGER NOT NULL,
                decision TEXT NOT NULL,
                skip_reason TEXT NOT NULL,
                scenario_json TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_watchlist_date ON watchlist (analyzed_date DESC);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create watchlist table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performance_tracker (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                market TEXT NOT NULL,
                analyzed_date DATE NOT NULL,
                trigger_type TEXT NOT NULL,
                price_t0 TEXT NOT NULL,
                price_7d TEXT,
                price_14d TEXT,
                price_30d TEXT,
                UNIQUE (ticker, market, analyzed_date, trigger_type)
            );
            CREATE INDEX IF NOT EXISTS idx_tracker_trigger ON performance_tracker (trigger_type, market);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create performance_tracker table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS journals (
                id TEXT PRIMARY KEY,
                trade_id TEXT NOT NULL UNIQUE,
                ticker TEXT NOT NULL,
                market TEXT NOT NULL,
                sector TEXT NOT NULL,
                trigger_type TEXT NOT NULL,
                buy_date DATE NOT NULL,
                sell_date DATE NOT NULL,
                sell_reason TEXT NOT NULL,
                profit_rate REAL NOT NULL,
                buy_context TEXT NOT NULL,
                sell_context TEXT NOT NULL,
                situation_analysis TEXT NOT NULL,
                judgment_evaluation TEXT NOT NULL,
                lessons_json TEXT NOT NULL DEFAULT '[]',
                pattern_tags_json TEXT NOT NULL DEFAULT '[]',
                one_line_summary TEXT NOT NULL,
                confidence REAL NOT NULL,
                layer INTEGER NOT NULL DEFAULT 1,
                compressed_summary TEXT,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_journals_layer ON journals (market, layer);
            CREATE INDEX IF NOT EXISTS idx_journals_ticker ON journals (ticker, market);
            CREATE INDEX IF NOT EXISTS idx_journals_tags ON journals (pattern_tags_json);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create journals table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS principles (
                id TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                condition_text TEXT NOT NULL,
                action_text TEXT NOT NULL,
                reason TEXT NOT NULL,
                scope TEXT NOT NULL,
                supporting_trades INTEGER NOT NULL,
                success_rate REAL NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                source_journal_ids_json TEXT NOT NULL DEFAULT '[]',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL,
                UNIQUE (market, condition_text, action_text)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create principles table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS intuitions (
                id TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT NOT NULL,
                condition_text TEXT NOT NULL,
                insight TEXT NOT NULL,
                confidence REAL NOT NULL,
                supporting_trades INTEGER NOT NULL,
                success_rate REAL NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                updated_at DATETIME NOT NULL,
                UNIQUE (market, category, subcategory, condition_text)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create intuitions table")?;

        info!("Database schema initialized.");
        Ok(())
    }
}
