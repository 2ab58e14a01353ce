//! Session artifacts: per-ticker markdown reports and the session-summary
//! JSON.

use crate::application::agents::TickerReport;
use crate::application::orchestrator::SessionSummary;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

#[derive(Clone)]
pub struct ArtifactWriter {
    base_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// `<base>/reports/<date>/<realm>-<code>.md`
    pub async fn write_report(&self, report: &TickerReport) -> Result<PathBuf> {
        let dir = self
            .base_dir
            .join("reports")
            .join(report.reference_date.to_string());
        ensure_dir(&dir).await?;

        let path = dir.join(format!(
            "{}-{}.md",
            report.ticker.realm.to_string().to_lowercase(),
            report.ticker.code
        ));
        fs::write(&path, report.to_markdown())
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!("Report written: {}", path.display());
        Ok(path)
    }

    /// `<base>/sessions/<date>-<mode>-<realm>.json`
    pub async fn write_session_summary(&self, summary: &SessionSummary) -> Result<PathBuf> {
        let dir = self.base_dir.join("sessions");
        ensure_dir(&dir).await?;

        let date = summary
            .trading_day
            .map(|d| d.to_string())
            .unwrap_or_else(|| "no-day".to_string());
        let path = dir.join(format!(
            "{}-{}-{}.json",
            date,
            summary.mode,
            summary.realm.to_string().to_lowercase()
        ));
        fs::write(&path, serde_json::to_vec_pretty(summary)?)
            .await
            .with_context(|| format!("Failed to write session summary {}", path.display()))?;
        info!("Session summary written: {}", path.display());
        Ok(path)
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    Ok(())
}
