use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::memory::journal::PerformanceRow;
use crate::domain::repositories::PerformanceTrackerRepository;
use crate::domain::trading::trigger::TriggerKind;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;

pub struct SqliteTrackerRepository {
    pool: SqlitePool,
}

impl SqliteTrackerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_performance(row: &SqliteRow) -> Result<PerformanceRow> {
    let market: String = row.try_get("market")?;
    let realm = Realm::from_str(&market)?;
    let parse_opt = |value: Option<String>| -> Result<Option<Decimal>> {
        value
            .map(|v| Decimal::from_str(&v).context("Corrupt price in tracker row"))
            .transpose()
    };

    Ok(PerformanceRow {
        ticker: Ticker::new(realm, row.try_get::<String, _>("ticker")?),
        analyzed_date: row.try_get("analyzed_date")?,
        trigger: TriggerKind::from_str(row.try_get("trigger_type")?)?,
        price_t0: Decimal::from_str(row.try_get("price_t0")?)?,
        price_7d: parse_opt(row.try_get("price_7d")?)?,
        price_14d: parse_opt(row.try_get("price_14d")?)?,
        price_30d: parse_opt(row.try_get("price_30d")?)?,
    })
}

#[async_trait]
impl PerformanceTrackerRepository for SqliteTrackerRepository {
    async fn insert(&self, row: &PerformanceRow) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO performance_tracker (ticker, market, analyzed_date, trigger_type, price_t0)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(ticker, market, analyzed_date, trigger_type) DO NOTHING
            "#,
        )
        .bind(&row.ticker.code)
        .bind(row.ticker.realm.as_str())
        .bind(row.analyzed_date)
        .bind(row.trigger.to_string())
        .bind(row.price_t0.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to insert tracker row")?;

        Ok(result.rows_affected() > 0)
    }

    async fn rows_for_trigger(
        &self,
        realm: Realm,
        trigger: TriggerKind,
    ) -> Result<Vec<PerformanceRow>> {
        let rows = sqlx::query(
            "SELECT * FROM performance_tracker WHERE market = ? AND trigger_type = ? ORDER BY analyzed_date DESC",
        )
        .bind(realm.as_str())
        .bind(trigger.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_performance).collect()
    }

    async fn pending_backfill(
        &self,
        realm: Realm,
        today: NaiveDate,
    ) -> Result<Vec<PerformanceRow>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM performance_tracker
            WHERE market = ?
              AND (
                (price_7d IS NULL AND date(analyzed_date, '+7 days') <= date(?))
                OR (price_14d IS NULL AND date(analyzed_date, '+14 days') <= date(?))
                OR (price_30d IS NULL AND date(analyzed_date, '+30 days') <= date(?))
              )
            ORDER BY analyzed_date
            "#,
        )
        .bind(realm.as_str())
        .bind(today)
        .bind(today)
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_performance).collect()
    }

    async fn fill_horizon(
        &self,
        ticker: &Ticker,
        analyzed_date: NaiveDate,
        trigger: TriggerKind,
        horizon_days: u32,
        price: Decimal,
    ) -> Result<()> {
        let column = match horizon_days {
            7 => "price_7d",
            14 => "price_14d",
            30 => "price_30d",
            other => bail!("Unsupported tracker horizon: {} days", other),
        };

        let query = format!(
            "UPDATE performance_tracker SET {} = ? \
             WHERE ticker = ? AND market = ? AND analyzed_date = ? AND trigger_type = ? AND {} IS NULL",
            column, column
        );

        sqlx::query(&query)
            .bind(price.to_string())
            .bind(&ticker.code)
            .bind(ticker.realm.as_str())
            .bind(analyzed_date)
            .bind(trigger.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to fill tracker horizon")?;

        Ok(())
    }
}
