//! Experiment registry repository.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::ExperimentRecord;

/// Repository for `fhq_learning.experiment_registry`.
#[derive(Debug, Clone)]
pub struct ExperimentRepository {
    pool: PgPool,
}

impl ExperimentRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers an experiment.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, record: &ExperimentRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO fhq_learning.experiment_registry
                (experiment_id, source_hypothesis_id, tier, parameters, dataset_signature,
                 status, result, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(record.experiment_id)
        .bind(record.source_hypothesis_id)
        .bind(record.tier)
        .bind(&record.parameters)
        .bind(&record.dataset_signature)
        .bind(&record.status)
        .bind(&record.result)
        .bind(record.started_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Completes every RUNNING experiment of a hypothesis with `result`.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn complete_running_for_hypothesis(
        conn: &mut PgConnection,
        canon_id: Uuid,
        result: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let outcome = sqlx::query(
            r"
            UPDATE fhq_learning.experiment_registry
            SET status = 'COMPLETED', result = $2, completed_at = $3
            WHERE source_hypothesis_id = $1 AND status = 'RUNNING'
            ",
        )
        .bind(canon_id)
        .bind(result)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(outcome.rows_affected())
    }
}
