//! Three-layer journal compression and knowledge cleanup.
//!
//! Both passes are idempotent: promotions key on layer and age, and the
//! intuition aggregation is recomputed deterministically from the layer-3
//! population on every run.

use crate::application::memory::TradingMemory;
use crate::domain::market::ticker::Realm;
use crate::domain::memory::journal::{CompressionLayer, Intuition, JournalEntry};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompressionReport {
    pub promoted_to_layer2: u64,
    pub promoted_to_layer3: u64,
    pub intuitions_updated: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub knowledge_deactivated: u64,
    pub knowledge_capped: u64,
    pub journals_deleted: u64,
}

/// The one-line layer-2 form: `{sector} + {trigger} → {action} → {outcome}`.
fn summarize_entry(entry: &JournalEntry) -> String {
    format!(
        "{} + {} → {} → {} ({:+.1}%)",
        entry.sector,
        entry.trigger,
        entry.sell_reason,
        entry.outcome_label(),
        entry.profit_rate * 100.0
    )
}

impl TradingMemory {
    /// Promote aged journals up the compression ladder and refresh the
    /// intuition aggregates. Safe to run repeatedly.
    pub async fn compress(
        &self,
        realm: Realm,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<CompressionReport> {
        let mut report = CompressionReport::default();

        let layer1_cutoff = now - Duration::days(self.config.layer1_age_days);
        for entry in self
            .journals
            .find_by_layer(realm, CompressionLayer::Detailed)
            .await?
        {
            if entry.created_at < layer1_cutoff {
                if !dry_run {
                    let summary = summarize_entry(&entry);
                    self.journals
                        .promote(&entry.id, CompressionLayer::Summarized, Some(&summary))
                        .await?;
                }
                report.promoted_to_layer2 += 1;
            }
        }

        let layer2_cutoff = now - Duration::days(self.config.layer2_age_days);
        for entry in self
            .journals
            .find_by_layer(realm, CompressionLayer::Summarized)
            .await?
        {
            if entry.created_at < layer2_cutoff {
                if !dry_run {
                    self.journals
                        .promote(&entry.id, CompressionLayer::Compressed, None)
                        .await?;
                }
                report.promoted_to_layer3 += 1;
            }
        }

        report.intuitions_updated = self.aggregate_intuitions(realm, dry_run).await?;

        info!(
            "Compression ({realm}): {} → L2, {} → L3, {} intuitions{}",
            report.promoted_to_layer2,
            report.promoted_to_layer3,
            report.intuitions_updated,
            if dry_run { " [dry-run]" } else { "" }
        );
        Ok(report)
    }

    /// Fold repeated layer-3 patterns into intuitions keyed by
    /// `(category, subcategory, condition)` with fresh statistics.
    async fn aggregate_intuitions(&self, realm: Realm, dry_run: bool) -> Result<u64> {
        let compressed = self
            .journals
            .find_by_layer(realm, CompressionLayer::Compressed)
            .await?;

        let mut groups: HashMap<(String, String, String), Vec<&JournalEntry>> = HashMap::new();
        for entry in &compressed {
            let condition = entry
                .pattern_tags
                .first()
                .cloned()
                .unwrap_or_else(|| "general".to_string());
            groups
                .entry((entry.sector.clone(), entry.trigger.to_string(), condition))
                .or_default()
                .push(entry);
        }

        let mut updated = 0;
        for ((category, subcategory, condition), entries) in groups {
            let n = entries.len() as u32;
            if n < self.config.min_supporting_trades {
                continue;
            }
            let wins = entries.iter().filter(|e| e.profit_rate > 0.0).count() as f64;
            let success_rate = wins / n as f64;
            // Confidence grows with evidence and distance from a coin flip
            let confidence =
                ((n as f64 / 10.0).min(1.0) * (0.5 + (success_rate - 0.5).abs())).min(0.95);
            let latest = entries
                .iter()
                .max_by_key(|e| e.created_at)
                .map(|e| e.one_line_summary.clone())
                .unwrap_or_default();

            if !dry_run {
                self.knowledge
                    .upsert_intuition(
                        realm,
                        &Intuition {
                            id: Uuid::new_v4().to_string(),
                            category,
                            subcategory,
                            condition,
                            insight: latest,
                            confidence,
                            supporting_trades: n,
                            success_rate,
                            is_active: true,
                            updated_at: Utc::now(),
                        },
                    )
                    .await?;
            }
            updated += 1;
        }
        Ok(updated)
    }

    /// Deactivate thin knowledge, cap the active sets, and delete layer-3
    /// journals past the archive window. Idempotent for a fixed clock.
    pub async fn cleanup(
        &self,
        realm: Realm,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        if dry_run {
            info!("Cleanup ({realm}): dry-run, no writes");
            return Ok(report);
        }

        let stale_cutoff = now - Duration::days(self.config.stale_days);
        report.knowledge_deactivated = self
            .knowledge
            .deactivate_stale(realm, self.config.min_supporting_trades, stale_cutoff)
            .await?;

        report.knowledge_capped = self
            .knowledge
            .cap_active(realm, self.config.max_principles, self.config.max_intuitions)
            .await?;

        let archive_cutoff = now - Duration::days(self.config.archive_days);
        report.journals_deleted = self
            .journals
            .delete_archived(realm, CompressionLayer::Compressed, archive_cutoff)
            .await?;

        info!(
            "Cleanup ({realm}): {} deactivated, {} capped, {} journals deleted",
            report.knowledge_deactivated, report.knowledge_capped, report.journals_deleted
        );
        Ok(report)
    }
}
