//! Evidence persistence for daemon cycles.
//!
//! Every cycle produces one [`CycleEvidence`] record. It is written as a
//! pretty-printed JSON file under `<dir>/<daemon>/` and, when enabled,
//! appended to the store's evidence table. Files are never overwritten: each
//! name carries the cycle's UTC start time and its cycle id. A cycle that
//! aborts still leaves a record carrying its error.

use chrono::{DateTime, Utc};
use fhq_core::{CycleEvidence, EvidenceConfig, EvidenceStore};
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};

/// Errors from evidence file persistence.
#[derive(Error, Debug)]
pub enum EvidenceError {
    /// IO error creating the directory or writing the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Evidence body of a cycle that aborted before producing a summary.
#[derive(Debug, Clone, Serialize)]
pub struct FailedCycle {
    pub outcome: &'static str,
    pub error: String,
}

impl FailedCycle {
    #[must_use]
    pub fn new(error: &anyhow::Error) -> Self {
        Self {
            outcome: "FAILED",
            error: format!("{error:#}"),
        }
    }
}

/// Writes cycle evidence to files and/or the store.
#[derive(Debug, Clone, Default)]
pub struct EvidenceWriter {
    dir: Option<PathBuf>,
    write_to_database: bool,
}

impl EvidenceWriter {
    #[must_use]
    pub fn new(dir: Option<PathBuf>, write_to_database: bool) -> Self {
        Self {
            dir,
            write_to_database,
        }
    }

    #[must_use]
    pub fn from_config(config: &EvidenceConfig) -> Self {
        Self::new(config.dir.clone(), config.write_to_database)
    }

    /// A writer that persists nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Path an evidence record is written to under `dir`.
    #[must_use]
    pub fn file_path(dir: &Path, evidence: &CycleEvidence) -> PathBuf {
        dir.join(&evidence.daemon).join(format!(
            "{}_{}.json",
            evidence.started_at.format("%Y%m%dT%H%M%SZ"),
            evidence.cycle_id
        ))
    }

    /// Writes one evidence file, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn write_file(dir: &Path, evidence: &CycleEvidence) -> Result<PathBuf, EvidenceError> {
        let path = Self::file_path(dir, evidence);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), evidence)?;

        debug!(path = %path.display(), cycle_id = %evidence.cycle_id, "Wrote cycle evidence");
        Ok(path)
    }

    /// Captures `summary` and persists it everywhere this writer is enabled.
    ///
    /// Persistence failures are logged and do not fail the cycle: the state
    /// changes it describes have already been committed.
    pub async fn record<E, S>(
        &self,
        store: &E,
        daemon: &str,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        summary: &S,
    ) -> Option<CycleEvidence>
    where
        E: EvidenceStore + ?Sized,
        S: Serialize + Sync,
    {
        let evidence = match CycleEvidence::capture(daemon, started_at, finished_at, summary) {
            Ok(evidence) => evidence,
            Err(e) => {
                error!(daemon, error = %e, "Failed to serialize cycle evidence");
                return None;
            }
        };

        if let Some(dir) = &self.dir {
            if let Err(e) = Self::write_file(dir, &evidence) {
                error!(daemon, cycle_id = %evidence.cycle_id, error = %e, "Failed to write evidence file");
            }
        }

        if self.write_to_database {
            if let Err(e) = store.record_evidence(&evidence).await {
                error!(daemon, cycle_id = %evidence.cycle_id, error = %e, "Failed to record evidence row");
            }
        }

        Some(evidence)
    }

    /// Records a finished cycle: its summary on success, a [`FailedCycle`]
    /// otherwise. Finish time is taken now.
    pub async fn record_outcome<E, S>(
        &self,
        store: &E,
        daemon: &str,
        started_at: DateTime<Utc>,
        outcome: &anyhow::Result<S>,
    ) -> Option<CycleEvidence>
    where
        E: EvidenceStore + ?Sized,
        S: Serialize + Sync,
    {
        let finished_at = Utc::now();
        match outcome {
            Ok(summary) => self.record(store, daemon, started_at, finished_at, summary).await,
            Err(e) => {
                self.record(store, daemon, started_at, finished_at, &FailedCycle::new(e))
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fhq_data::MemoryStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_file_path_layout() {
        let evidence =
            CycleEvidence::capture("orphan_cleanup", started(), started(), &json!({})).unwrap();
        let path = EvidenceWriter::file_path(Path::new("/var/evidence"), &evidence);

        assert_eq!(
            path,
            PathBuf::from(format!(
                "/var/evidence/orphan_cleanup/20260601T123005Z_{}.json",
                evidence.cycle_id
            ))
        );
    }

    #[tokio::test]
    async fn test_record_writes_file_and_row() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        let writer = EvidenceWriter::new(Some(dir.path().to_path_buf()), true);

        let evidence = writer
            .record(&store, "time_death", started(), started(), &json!({ "deaths": 2 }))
            .await
            .unwrap();

        let path = EvidenceWriter::file_path(dir.path(), &evidence);
        let on_disk: CycleEvidence =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(on_disk, evidence);
        assert_eq!(on_disk.summary["deaths"], 2);
        assert_eq!(store.evidence(), vec![evidence]);
    }

    #[tokio::test]
    async fn test_disabled_writer_persists_nothing() {
        let store = MemoryStore::new();
        let evidence = EvidenceWriter::disabled()
            .record(&store, "falsification", started(), started(), &json!({}))
            .await;

        assert!(evidence.is_some());
        assert!(store.evidence().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let writer = EvidenceWriter::new(Some(dir.path().to_path_buf()), true);

        let evidence = writer
            .record(&store, "falsification", started(), started(), &json!({}))
            .await
            .unwrap();

        assert!(EvidenceWriter::file_path(dir.path(), &evidence).exists());
    }

    #[tokio::test]
    async fn test_failed_cycle_still_leaves_file() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let writer = EvidenceWriter::new(Some(dir.path().to_path_buf()), true);
        let outcome: anyhow::Result<serde_json::Value> =
            Err(anyhow::anyhow!("connection refused").context("Failed to load candidates"));

        let evidence = writer
            .record_outcome(&store, "falsification", started(), &outcome)
            .await
            .unwrap();

        let path = EvidenceWriter::file_path(dir.path(), &evidence);
        let on_disk: CycleEvidence =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(on_disk.summary["outcome"], "FAILED");
        assert_eq!(
            on_disk.summary["error"],
            "Failed to load candidates: connection refused"
        );
    }

    #[test]
    fn test_cycles_never_share_a_file() {
        let a = CycleEvidence::capture("x", started(), started(), &json!({})).unwrap();
        let b = CycleEvidence::capture("x", started(), started(), &json!({})).unwrap();
        let dir = Path::new("/tmp");
        assert_ne!(EvidenceWriter::file_path(dir, &a), EvidenceWriter::file_path(dir, &b));
    }
}
