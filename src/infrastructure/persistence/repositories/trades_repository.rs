use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::repositories::{TradeRepository, WatchlistRepository};
use crate::domain::trading::scenario::Scenario;
use crate::domain::trading::trigger::{SessionMode, TriggerKind};
use crate::domain::trading::types::{Trade, WatchlistEntry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;

pub struct SqliteTradeRepository {
    pool: SqlitePool,
}

impl SqliteTradeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_trade(row: &SqliteRow) -> Result<Trade> {
    let market: String = row.try_get("market")?;
    let realm = Realm::from_str(&market)?;
    let reason: String = row.try_get("sell_reason")?;

    Ok(Trade {
        id: row.try_get("id")?,
        ticker: Ticker::new(realm, row.try_get::<String, _>("ticker")?),
        name: row.try_get("name")?,
        sector: row.try_get("sector")?,
        buy_price: Decimal::from_str(row.try_get("buy_price")?)?,
        buy_date: row.try_get("buy_date")?,
        sell_price: Decimal::from_str(row.try_get("sell_price")?)?,
        sell_date: row.try_get("sell_date")?,
        quantity: Decimal::from_str(row.try_get("quantity")?)?,
        sell_reason: serde_json::from_value(serde_json::Value::String(reason))
            .context("Corrupt sell_reason in trades row")?,
        profit_rate: row.try_get("profit_rate")?,
        holding_days: row.try_get("holding_days")?,
        trigger: TriggerKind::from_str(row.try_get("trigger_type")?)?,
        session: SessionMode::from_str(row.try_get("trigger_mode")?)?,
        scenario: serde_json::from_str(row.try_get("scenario_json")?)
            .context("Corrupt scenario_json in trades row")?,
    })
}

#[async_trait]
impl TradeRepository for SqliteTradeRepository {
    async fn save(&self, trade: &Trade) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                id, ticker, market, name, sector, buy_price, buy_date,
                sell_price, sell_date, quantity, sell_reason, profit_rate,
                holding_days, trigger_type, trigger_mode, scenario_json
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&trade.id)
        .bind(&trade.ticker.code)
        .bind(trade.ticker.realm.as_str())
        .bind(&trade.name)
        .bind(&trade.sector)
        .bind(trade.buy_price.to_string())
        .bind(trade.buy_date)
        .bind(trade.sell_price.to_string())
        .bind(trade.sell_date)
        .bind(trade.quantity.to_string())
        .bind(trade.sell_reason.to_string())
        .bind(trade.profit_rate)
        .bind(trade.holding_days)
        .bind(trade.trigger.to_string())
        .bind(trade.session.to_string())
        .bind(serde_json::to_string(&trade.scenario)?)
        .execute(&self.pool)
        .await
        .context("Failed to save trade")?;

        Ok(())
    }

    async fn recent_for_ticker(&self, ticker: &Ticker, limit: usize) -> Result<Vec<Trade>> {
        let rows = sqlx::query(
            "SELECT * FROM trades WHERE ticker = ? AND market = ? ORDER BY sell_date DESC LIMIT ?",
        )
        .bind(&ticker.code)
        .bind(ticker.realm.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_trade).collect()
    }

    async fn find_all(&self, realm: Realm) -> Result<Vec<Trade>> {
        let rows = sqlx::query("SELECT * FROM trades WHERE market = ? ORDER BY sell_date DESC")
            .bind(realm.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_trade).collect()
    }
}

pub struct SqliteWatchlistRepository {
    pool: SqlitePool,
}

impl SqliteWatchlistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchlistRepository for SqliteWatchlistRepository {
    async fn save(&self, entry: &WatchlistEntry) -> Result<()> {
        let scenario_json = entry
            .scenario
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO watchlist (ticker, market, analyzed_date, buy_score, decision, skip_reason, scenario_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.ticker.code)
        .bind(entry.ticker.realm.as_str())
        .bind(entry.analyzed_date)
        .bind(entry.buy_score as i64)
        .bind(&entry.decision)
        .bind(&entry.skip_reason)
        .bind(scenario_json)
        .execute(&self.pool)
        .await
        .context("Failed to save watchlist entry")?;

        Ok(())
    }

    async fn recent(&self, realm: Realm, limit: usize) -> Result<Vec<WatchlistEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM watchlist WHERE market = ? ORDER BY analyzed_date DESC, id DESC LIMIT ?",
        )
        .bind(realm.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let scenario: Option<Scenario> = row
                    .try_get::<Option<String>, _>("scenario_json")?
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .context("Corrupt scenario_json in watchlist row")?;
                Ok(WatchlistEntry {
                    ticker: Ticker::new(realm, row.try_get::<String, _>("ticker")?),
                    analyzed_date: row.try_get("analyzed_date")?,
                    buy_score: row.try_get::<i64, _>("buy_score")? as u8,
                    decision: row.try_get("decision")?,
                    skip_reason: row.try_get("skip_reason")?,
                    scenario,
                })
            })
            .collect()
    }
}
