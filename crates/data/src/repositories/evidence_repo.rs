//! Lifecycle evidence repository (append-only).

use anyhow::Result;
use fhq_core::CycleEvidence;
use sqlx::PgPool;

/// Repository for `fhq_learning.lifecycle_evidence`.
#[derive(Debug, Clone)]
pub struct EvidenceRepository {
    pool: PgPool,
}

impl EvidenceRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Appends one cycle's evidence.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, evidence: &CycleEvidence) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO fhq_learning.lifecycle_evidence
                (cycle_id, daemon, started_at, finished_at, summary)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(evidence.cycle_id)
        .bind(&evidence.daemon)
        .bind(evidence.started_at)
        .bind(evidence.finished_at)
        .bind(&evidence.summary)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent evidence rows for a daemon, newest first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_recent(&self, daemon: &str, limit: i64) -> Result<Vec<CycleEvidence>> {
        let rows = sqlx::query_as::<_, (
            uuid::Uuid,
            String,
            chrono::DateTime<chrono::Utc>,
            chrono::DateTime<chrono::Utc>,
            serde_json::Value,
        )>(
            r"
            SELECT cycle_id, daemon, started_at, finished_at, summary
            FROM fhq_learning.lifecycle_evidence
            WHERE daemon = $1
            ORDER BY started_at DESC
            LIMIT $2
            ",
        )
        .bind(daemon)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CycleEvidence {
                cycle_id: r.0,
                daemon: r.1,
                started_at: r.2,
                finished_at: r.3,
                summary: r.4,
            })
            .collect())
    }
}
