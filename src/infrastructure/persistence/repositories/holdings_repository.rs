use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::repositories::HoldingRepository;
use crate::domain::trading::scenario::Scenario;
use crate::domain::trading::trigger::{SessionMode, TriggerKind};
use crate::domain::trading::types::Holding;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;

pub struct SqliteHoldingRepository {
    pool: SqlitePool,
}

impl SqliteHoldingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_holding(row: &SqliteRow) -> Result<Holding> {
    let market: String = row.try_get("market")?;
    let realm = Realm::from_str(&market)?;
    let scenario: Scenario = serde_json::from_str(row.try_get("scenario_json")?)
        .context("Corrupt scenario_json in holdings row")?;
    let history: Vec<Scenario> = serde_json::from_str(row.try_get("scenario_history_json")?)
        .unwrap_or_default();

    Ok(Holding {
        ticker: Ticker::new(realm, row.try_get::<String, _>("ticker")?),
        name: row.try_get("name")?,
        sector: row.try_get("sector")?,
        buy_price: Decimal::from_str(row.try_get("buy_price")?)?,
        buy_date: row.try_get("buy_date")?,
        quantity: Decimal::from_str(row.try_get("quantity")?)?,
        trigger: TriggerKind::from_str(row.try_get("trigger_type")?)?,
        session: SessionMode::from_str(row.try_get("trigger_mode")?)?,
        scenario,
        scenario_history: history,
        current_price: Decimal::from_str(row.try_get("current_price")?)?,
        last_updated: row.try_get("last_updated")?,
    })
}

#[async_trait]
impl HoldingRepository for SqliteHoldingRepository {
    async fn save(&self, holding: &Holding) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO holdings (
                ticker, market, name, sector, buy_price, buy_date, quantity,
                trigger_type, trigger_mode, scenario_json,
                scenario_history_json, current_price, last_updated
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(ticker, market) DO UPDATE SET
                scenario_json = excluded.scenario_json,
                scenario_history_json = excluded.scenario_history_json,
                current_price = excluded.current_price,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&holding.ticker.code)
        .bind(holding.ticker.realm.as_str())
        .bind(&holding.name)
        .bind(&holding.sector)
        .bind(holding.buy_price.to_string())
        .bind(holding.buy_date)
        .bind(holding.quantity.to_string())
        .bind(holding.trigger.to_string())
        .bind(holding.session.to_string())
        .bind(serde_json::to_string(&holding.scenario)?)
        .bind(serde_json::to_string(&holding.scenario_history)?)
        .bind(holding.current_price.to_string())
        .bind(holding.last_updated)
        .execute(&self.pool)
        .await
        .context("Failed to save holding")?;

        Ok(())
    }

    async fn delete(&self, ticker: &Ticker) -> Result<()> {
        sqlx::query("DELETE FROM holdings WHERE ticker = ? AND market = ?")
            .bind(&ticker.code)
            .bind(ticker.realm.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to delete holding")?;
        Ok(())
    }

    async fn find_all(&self, realm: Realm) -> Result<Vec<Holding>> {
        let rows = sqlx::query("SELECT * FROM holdings WHERE market = ? ORDER BY buy_date")
            .bind(realm.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_holding).collect()
    }

    async fn update_price(
        &self,
        ticker: &Ticker,
        price: Decimal,
        ts: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE holdings SET current_price = ?, last_updated = ? WHERE ticker = ? AND market = ?",
        )
        .bind(price.to_string())
        .bind(ts)
        .bind(&ticker.code)
        .bind(ticker.realm.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to update holding price")?;
        Ok(())
    }
}
