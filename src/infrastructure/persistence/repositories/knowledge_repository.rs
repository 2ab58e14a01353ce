use crate::domain::market::ticker::Realm;
use crate::domain::memory::journal::{Intuition, Principle, PrincipleScope};
use crate::domain::repositories::KnowledgeRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub struct SqliteKnowledgeRepository {
    pool: SqlitePool,
}

impl SqliteKnowledgeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KnowledgeRepository for SqliteKnowledgeRepository {
    async fn upsert_principle(&self, realm: Realm, principle: &Principle) -> Result<()> {
        // On conflict: one more supporting trade, running-average success
        // rate, merged source journals.
        sqlx::query(
            r#"
            INSERT INTO principles (
                id, market, condition_text, action_text, reason, scope,
                supporting_trades, success_rate, is_active,
                source_journal_ids_json, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(market, condition_text, action_text) DO UPDATE SET
                supporting_trades = principles.supporting_trades + 1,
                success_rate = (principles.success_rate * principles.supporting_trades
                                + excluded.success_rate)
                               / (principles.supporting_trades + 1),
                source_journal_ids_json = json_insert(
                    principles.source_journal_ids_json,
                    '$[#]',
                    json_extract(excluded.source_journal_ids_json, '$[0]')
                ),
                is_active = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&principle.id)
        .bind(realm.as_str())
        .bind(&principle.condition)
        .bind(&principle.action)
        .bind(&principle.reason)
        .bind(principle.scope.to_string())
        .bind(principle.supporting_trades as i64)
        .bind(principle.success_rate)
        .bind(principle.is_active)
        .bind(serde_json::to_string(&principle.source_journal_ids)?)
        .bind(principle.created_at)
        .bind(principle.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert principle")?;

        Ok(())
    }

    async fn active_principles(
        &self,
        realm: Realm,
        min_supporting: u32,
        limit: usize,
    ) -> Result<Vec<Principle>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM principles
            WHERE market = ? AND is_active = 1 AND supporting_trades >= ?
            ORDER BY success_rate DESC, supporting_trades DESC
            LIMIT ?
            "#,
        )
        .bind(realm.as_str())
        .bind(min_supporting as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(Principle {
                    id: row.try_get("id")?,
                    condition: row.try_get("condition_text")?,
                    action: row.try_get("action_text")?,
                    reason: row.try_get("reason")?,
                    scope: PrincipleScope::from_str(row.try_get("scope")?)?,
                    supporting_trades: row.try_get::<i64, _>("supporting_trades")? as u32,
                    success_rate: row.try_get("success_rate")?,
                    is_active: row.try_get("is_active")?,
                    source_journal_ids: serde_json::from_str(
                        row.try_get("source_journal_ids_json")?,
                    )
                    .unwrap_or_default(),
                    created_at: row.try_get("created_at")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    async fn upsert_intuition(&self, realm: Realm, intuition: &Intuition) -> Result<()> {
        // The aggregation pass recomputes statistics from scratch, so the
        // conflict branch replaces rather than accumulates.
        sqlx::query(
            r#"
            INSERT INTO intuitions (
                id, market, category, subcategory, condition_text, insight,
                confidence, supporting_trades, success_rate, is_active, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(market, category, subcategory, condition_text) DO UPDATE SET
                insight = excluded.insight,
                confidence = excluded.confidence,
                supporting_trades = excluded.supporting_trades,
                success_rate = excluded.success_rate,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&intuition.id)
        .bind(realm.as_str())
        .bind(&intuition.category)
        .bind(&intuition.subcategory)
        .bind(&intuition.condition)
        .bind(&intuition.insight)
        .bind(intuition.confidence)
        .bind(intuition.supporting_trades as i64)
        .bind(intuition.success_rate)
        .bind(intuition.is_active)
        .bind(intuition.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to upsert intuition")?;

        Ok(())
    }

    async fn active_intuitions(
        &self,
        realm: Realm,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Intuition>> {
        let rows = match category {
            Some(category) => {
                sqlx::query(
                    r#"
                    SELECT * FROM intuitions
                    WHERE market = ? AND is_active = 1 AND category = ?
                    ORDER BY confidence DESC, supporting_trades DESC
                    LIMIT ?
                    "#,
                )
                .bind(realm.as_str())
                .bind(category)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT * FROM intuitions
                    WHERE market = ? AND is_active = 1
                    ORDER BY confidence DESC, supporting_trades DESC
                    LIMIT ?
                    "#,
                )
                .bind(realm.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| {
                Ok(Intuition {
                    id: row.try_get("id")?,
                    category: row.try_get("category")?,
                    subcategory: row.try_get("subcategory")?,
                    condition: row.try_get("condition_text")?,
                    insight: row.try_get("insight")?,
                    confidence: row.try_get("confidence")?,
                    supporting_trades: row.try_get::<i64, _>("supporting_trades")? as u32,
                    success_rate: row.try_get("success_rate")?,
                    is_active: row.try_get("is_active")?,
                    updated_at: row.try_get("updated_at")?,
                })
            })
            .collect()
    }

    async fn deactivate_stale(
        &self,
        realm: Realm,
        min_supporting: u32,
        cutoff: DateTime<Utc>,
    ) -> Result<u64> {
        let principles = sqlx::query(
            r#"
            UPDATE principles SET is_active = 0
            WHERE market = ? AND is_active = 1
              AND supporting_trades < ? AND updated_at < ?
            "#,
        )
        .bind(realm.as_str())
        .bind(min_supporting as i64)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to deactivate stale principles")?;

        let intuitions = sqlx::query(
            r#"
            UPDATE intuitions SET is_active = 0
            WHERE market = ? AND is_active = 1
              AND supporting_trades < ? AND updated_at < ?
            "#,
        )
        .bind(realm.as_str())
        .bind(min_supporting as i64)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .context("Failed to deactivate stale intuitions")?;

        Ok(principles.rows_affected() + intuitions.rows_affected())
    }

    async fn cap_active(
        &self,
        realm: Realm,
        max_principles: usize,
        max_intuitions: usize,
    ) -> Result<u64> {
        let principles = sqlx::query(
            r#"
            UPDATE principles SET is_active = 0
            WHERE market = ? AND is_active = 1 AND id NOT IN (
                SELECT id FROM principles
                WHERE market = ? AND is_active = 1
                ORDER BY success_rate DESC, supporting_trades DESC
                LIMIT ?
            )
            "#,
        )
        .bind(realm.as_str())
        .bind(realm.as_str())
        .bind(max_principles as i64)
        .execute(&self.pool)
        .await
        .context("Failed to cap principles")?;

        let intuitions = sqlx::query(
            r#"
            UPDATE intuitions SET is_active = 0
            WHERE market = ? AND is_active = 1 AND id NOT IN (
                SELECT id FROM intuitions
                WHERE market = ? AND is_active = 1
                ORDER BY confidence DESC, supporting_trades DESC
                LIMIT ?
            )
            "#,
        )
        .bind(realm.as_str())
        .bind(realm.as_str())
        .bind(max_intuitions as i64)
        .execute(&self.pool)
        .await
        .context("Failed to cap intuitions")?;

        Ok(principles.rows_affected() + intuitions.rows_affected())
    }
}
