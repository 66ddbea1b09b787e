//! Capital simulation repository.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::CapitalSimulationRecord;

/// Repository for `fhq_execution.capital_simulations`.
#[derive(Debug, Clone)]
pub struct CapitalSimulationRepository {
    pool: PgPool,
}

impl CapitalSimulationRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a simulation entry.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, record: &CapitalSimulationRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO fhq_execution.capital_simulations
                (simulation_id, source_hypothesis_id, status, allocated_capital,
                 opened_at, stopped_at, stop_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(record.simulation_id)
        .bind(record.source_hypothesis_id)
        .bind(&record.status)
        .bind(record.allocated_capital)
        .bind(record.opened_at)
        .bind(record.stopped_at)
        .bind(&record.stop_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stops every OPEN simulation of a hypothesis.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn stop_open_for_hypothesis(
        conn: &mut PgConnection,
        canon_id: Uuid,
        stop_reason: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE fhq_execution.capital_simulations
            SET status = 'STOPPED', stop_reason = $2, stopped_at = $3
            WHERE source_hypothesis_id = $1 AND status = 'OPEN'
            ",
        )
        .bind(canon_id)
        .bind(stop_reason)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
