use crate::domain::market::ticker::{Realm, Ticker};
use crate::domain::memory::journal::{CompressionLayer, JournalEntry};
use crate::domain::repositories::JournalRepository;
use crate::domain::trading::trigger::TriggerKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use std::str::FromStr;

pub struct SqliteJournalRepository {
    pool: SqlitePool,
}

impl SqliteJournalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_journal(row: &SqliteRow) -> Result<JournalEntry> {
    let market: String = row.try_get("market")?;
    let realm = Realm::from_str(&market)?;
    let layer: i64 = row.try_get("layer")?;
    let reason: String = row.try_get("sell_reason")?;

    Ok(JournalEntry {
        id: row.try_get("id")?,
        trade_id: row.try_get("trade_id")?,
        ticker: Ticker::new(realm, row.try_get::<String, _>("ticker")?),
        sector: row.try_get("sector")?,
        trigger: TriggerKind::from_str(row.try_get("trigger_type")?)?,
        buy_date: row.try_get("buy_date")?,
        sell_date: row.try_get("sell_date")?,
        sell_reason: serde_json::from_value(serde_json::Value::String(reason))
            .context("Corrupt sell_reason in journals row")?,
        profit_rate: row.try_get("profit_rate")?,
        buy_context: row.try_get("buy_context")?,
        sell_context: row.try_get("sell_context")?,
        situation_analysis: row.try_get("situation_analysis")?,
        judgment_evaluation: row.try_get("judgment_evaluation")?,
        lessons: serde_json::from_str(row.try_get("lessons_json")?).unwrap_or_default(),
        pattern_tags: serde_json::from_str(row.try_get("pattern_tags_json")?).unwrap_or_default(),
        one_line_summary: row.try_get("one_line_summary")?,
        confidence: row.try_get("confidence")?,
        layer: CompressionLayer::from_i64(layer)
            .with_context(|| format!("Invalid journal layer {}", layer))?,
        compressed_summary: row.try_get("compressed_summary")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl JournalRepository for SqliteJournalRepository {
    async fn insert(&self, entry: &JournalEntry) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO journals (
                id, trade_id, ticker, market, sector, trigger_type,
                buy_date, sell_date, sell_reason, profit_rate,
                buy_context, sell_context, situation_analysis,
                judgment_evaluation, lessons_json, pattern_tags_json,
                one_line_summary, confidence, layer, compressed_summary,
                created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(trade_id) DO NOTHING
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.trade_id)
        .bind(&entry.ticker.code)
        .bind(entry.ticker.realm.as_str())
        .bind(&entry.sector)
        .bind(entry.trigger.to_string())
        .bind(entry.buy_date)
        .bind(entry.sell_date)
        .bind(entry.sell_reason.to_string())
        .bind(entry.profit_rate)
        .bind(&entry.buy_context)
        .bind(&entry.sell_context)
        .bind(&entry.situation_analysis)
        .bind(&entry.judgment_evaluation)
        .bind(serde_json::to_string(&entry.lessons)?)
        .bind(serde_json::to_string(&entry.pattern_tags)?)
        .bind(&entry.one_line_summary)
        .bind(entry.confidence)
        .bind(entry.layer.as_i64())
        .bind(&entry.compressed_summary)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert journal")?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_layer(
        &self,
        realm: Realm,
        layer: CompressionLayer,
    ) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM journals WHERE market = ? AND layer = ? ORDER BY created_at",
        )
        .bind(realm.as_str())
        .bind(layer.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_journal).collect()
    }

    async fn promote(
        &self,
        id: &str,
        layer: CompressionLayer,
        compressed_summary: Option<&str>,
    ) -> Result<()> {
        // Keep the existing summary when promoting without a new one
        sqlx::query(
            "UPDATE journals SET layer = ?, compressed_summary = COALESCE(?, compressed_summary) WHERE id = ?",
        )
        .bind(layer.as_i64())
        .bind(compressed_summary)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to promote journal")?;
        Ok(())
    }

    async fn delete_archived(
        &self,
        realm: Realm,
        layer: CompressionLayer,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM journals WHERE market = ? AND layer = ? AND created_at < ?",
        )
        .bind(realm.as_str())
        .bind(layer.as_i64())
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to delete archived journals")?;
        Ok(result.rows_affected())
    }

    async fn recent_for_ticker(&self, ticker: &Ticker, limit: usize) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM journals WHERE ticker = ? AND market = ? ORDER BY created_at DESC LIMIT ?",
        )
        .bind(&ticker.code)
        .bind(ticker.realm.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_journal).collect()
    }
}
