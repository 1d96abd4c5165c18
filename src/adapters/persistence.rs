//! Decision Log - Append-only JSONL Analysis Records
//!
//! Persists completed analyses to daily JSONL files in the format
//! `decisions/YYYY-MM-DD.jsonl` and keeps a single accuracy snapshot
//! at `accuracy_snapshot.json` so calibration survives restarts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::domain::accuracy::AccuracyTracker;
use crate::domain::prediction::BettingAnalysis;

/// Append-only JSONL decision logger with daily file rotation.
///
/// Decision files are named `decisions/YYYY-MM-DD.jsonl` and each
/// line is a complete JSON object. This format is optimized for:
/// - Append-only writes (no read-modify-write)
/// - Line-by-line streaming for analysis
/// - Natural daily partitioning
pub struct DecisionLog {
    /// Base directory for decision files.
    decisions_dir: PathBuf,
    /// Path for the accuracy tracker snapshot.
    snapshot_path: PathBuf,
}

impl DecisionLog {
    /// Create a new decision log in the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let decisions_dir = Path::new(data_dir).join("decisions");
        let snapshot_path = Path::new(data_dir).join("accuracy_snapshot.json");

        fs::create_dir_all(&decisions_dir)
            .await
            .context("Failed to create decisions directory")?;

        Ok(Self {
            decisions_dir,
            snapshot_path,
        })
    }

    /// Append an analysis to today's JSONL file.
    #[instrument(skip(self, analysis), fields(analysis_id = %analysis.id))]
    pub async fn append_analysis(&self, analysis: &BettingAnalysis) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.decisions_dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(analysis)
            .context("Failed to serialize analysis")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open decision log file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write analysis record")?;

        file.flush().await.context("Failed to flush decision log")?;

        Ok(())
    }

    /// Load all analyses from all daily files.
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<Vec<BettingAnalysis>> {
        let mut analyses = Vec::new();
        let mut entries = fs::read_dir(&self.decisions_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<BettingAnalysis>(line) {
                        Ok(record) => analyses.push(record),
                        Err(e) => {
                            tracing::warn!(
                                file = %path.display(),
                                error = %e,
                                "Skipping malformed analysis record"
                            );
                        }
                    }
                }
            }
        }

        analyses.sort_by_key(|a| a.analyzed_at);
        info!(count = analyses.len(), "Loaded analysis records");
        Ok(analyses)
    }

    /// Persist the accuracy tracker so calibration survives restarts.
    pub async fn save_accuracy_snapshot(&self, tracker: &AccuracyTracker) -> Result<()> {
        let json = serde_json::to_string_pretty(tracker)
            .context("Failed to serialize accuracy snapshot")?;
        fs::write(&self.snapshot_path, json)
            .await
            .context("Failed to write accuracy snapshot")?;
        Ok(())
    }

    /// Load the persisted accuracy tracker, if any.
    pub async fn load_accuracy_snapshot(&self) -> Result<Option<AccuracyTracker>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.snapshot_path)
            .await
            .context("Failed to read accuracy snapshot")?;
        let tracker = serde_json::from_str(&content)
            .context("Failed to parse accuracy snapshot")?;
        Ok(Some(tracker))
    }

    /// Check if the decisions directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.decisions_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }
}
