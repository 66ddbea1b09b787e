//! Hypothesis canon repository.
//!
//! All status writes are predicate-guarded: the caller states which states a
//! row may be in, and the affected-row count tells it whether the write did
//! anything.

use anyhow::Result;
use chrono::{DateTime, Utc};
use fhq_core::{HypothesisStatus, OrphanedHypothesis, TransitionRequest};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::HypothesisRecord;

const SELECT_COLUMNS: &str = r"
    SELECT canon_id, hypothesis_code, status, created_at, expected_timeframe_hours,
           generator_id, pre_tier_score_at_birth, falsified_at, death_timestamp,
           annihilation_reason, last_evaluated_at
    FROM fhq_learning.hypothesis_canon h
";

/// Repository for `fhq_learning.hypothesis_canon`.
#[derive(Debug, Clone)]
pub struct HypothesisRepository {
    pool: PgPool,
}

impl HypothesisRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a hypothesis row.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, record: &HypothesisRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO fhq_learning.hypothesis_canon
                (canon_id, hypothesis_code, status, created_at, expected_timeframe_hours,
                 generator_id, pre_tier_score_at_birth, falsified_at, death_timestamp,
                 annihilation_reason, last_evaluated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(record.canon_id)
        .bind(&record.hypothesis_code)
        .bind(&record.status)
        .bind(record.created_at)
        .bind(record.expected_timeframe_hours)
        .bind(&record.generator_id)
        .bind(record.pre_tier_score_at_birth)
        .bind(record.falsified_at)
        .bind(record.death_timestamp)
        .bind(&record.annihilation_reason)
        .bind(record.last_evaluated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a hypothesis by canonical ID.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_by_id(&self, canon_id: Uuid) -> Result<Option<HypothesisRecord>> {
        let record = sqlx::query_as::<_, HypothesisRecord>(&format!(
            "{SELECT_COLUMNS} WHERE h.canon_id = $1"
        ))
        .bind(canon_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Live hypotheses with at least one CLOSED + REALIZED shadow trade,
    /// least recently evaluated first.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_falsification_candidates(
        &self,
        states: &[HypothesisStatus],
        limit: u32,
    ) -> Result<Vec<HypothesisRecord>> {
        let records = sqlx::query_as::<_, HypothesisRecord>(&format!(
            r"{SELECT_COLUMNS}
            WHERE h.status = ANY($1)
              AND EXISTS (
                  SELECT 1 FROM fhq_execution.shadow_trades t
                  WHERE t.source_hypothesis_id = h.canon_id
                    AND t.status = 'CLOSED' AND t.pnl_type = 'REALIZED'
              )
            ORDER BY h.last_evaluated_at ASC NULLS FIRST, h.created_at ASC
            LIMIT $2
            "
        ))
        .bind(HypothesisStatus::spellings(states))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Records when the trade-based path last judged a hypothesis.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn mark_evaluated(&self, canon_id: Uuid, evaluated_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            UPDATE fhq_learning.hypothesis_canon
            SET last_evaluated_at = $2
            WHERE canon_id = $1
            ",
        )
        .bind(canon_id)
        .bind(evaluated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Hypotheses in `states` whose declared horizon elapsed before `now`.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_expired(
        &self,
        states: &[HypothesisStatus],
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<HypothesisRecord>> {
        let records = sqlx::query_as::<_, HypothesisRecord>(&format!(
            r"{SELECT_COLUMNS}
            WHERE h.status = ANY($1)
              AND h.expected_timeframe_hours IS NOT NULL
              AND h.created_at + make_interval(hours => h.expected_timeframe_hours) < $2
            ORDER BY h.created_at ASC
            LIMIT $3
            "
        ))
        .bind(HypothesisStatus::spellings(states))
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Applies a FALSIFIED transition if the row is still in an allowed state.
    ///
    /// Returns the number of rows changed.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn falsify(&self, request: &TransitionRequest) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE fhq_learning.hypothesis_canon
            SET status = 'FALSIFIED',
                falsified_at = $2,
                death_timestamp = $2,
                annihilation_reason = $3,
                updated_at = NOW()
            WHERE canon_id = $1
              AND status = ANY($4)
            ",
        )
        .bind(request.canon_id)
        .bind(request.evaluated_at)
        .bind(request.reason.to_string())
        .bind(HypothesisStatus::spellings(&request.allowed_from))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// FALSIFIED hypotheses with at least one live dependent.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_orphaned(&self, limit: u32) -> Result<Vec<OrphanedHypothesis>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, i64, i64, i64)>(
            r"
            SELECT canon_id, hypothesis_code, annihilation_reason,
                   open_trades, open_simulations, running_experiments
            FROM (
                SELECT h.canon_id, h.hypothesis_code, h.annihilation_reason, h.falsified_at,
                       (SELECT COUNT(*) FROM fhq_execution.shadow_trades t
                         WHERE t.source_hypothesis_id = h.canon_id AND t.status = 'OPEN')
                           AS open_trades,
                       (SELECT COUNT(*) FROM fhq_execution.capital_simulations c
                         WHERE c.source_hypothesis_id = h.canon_id AND c.status = 'OPEN')
                           AS open_simulations,
                       (SELECT COUNT(*) FROM fhq_learning.experiment_registry e
                         WHERE e.source_hypothesis_id = h.canon_id AND e.status = 'RUNNING')
                           AS running_experiments
                FROM fhq_learning.hypothesis_canon h
                WHERE h.status = 'FALSIFIED'
            ) o
            WHERE open_trades > 0 OR open_simulations > 0 OR running_experiments > 0
            ORDER BY falsified_at ASC NULLS FIRST
            LIMIT $1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| OrphanedHypothesis {
                canon_id: r.0,
                hypothesis_code: r.1,
                annihilation_reason: r.2,
                open_trades: r.3,
                open_simulations: r.4,
                running_experiments: r.5,
            })
            .collect())
    }

    /// FALSIFIED hypotheses that have no post-mortem row.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_falsified_without_post_mortem(
        &self,
        limit: u32,
    ) -> Result<Vec<HypothesisRecord>> {
        let records = sqlx::query_as::<_, HypothesisRecord>(&format!(
            r"{SELECT_COLUMNS}
            WHERE h.status = 'FALSIFIED'
              AND NOT EXISTS (
                  SELECT 1 FROM fhq_learning.hypothesis_post_mortem p
                  WHERE p.canon_id = h.canon_id
              )
            ORDER BY h.falsified_at ASC NULLS FIRST
            LIMIT $1
            "
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Records the post-mortem link, an audit-only field writable after death.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn link_post_mortem(
        conn: &mut PgConnection,
        canon_id: Uuid,
        post_mortem_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE fhq_learning.hypothesis_canon
            SET post_mortem_id = $2
            WHERE canon_id = $1 AND post_mortem_id IS NULL
            ",
        )
        .bind(canon_id)
        .bind(post_mortem_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts hypotheses per status.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r"
            SELECT status, COUNT(*)
            FROM fhq_learning.hypothesis_canon
            GROUP BY status
            ORDER BY status
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts hypotheses the time-based path would kill at `now`.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count_expired(&self, states: &[HypothesisStatus], now: DateTime<Utc>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM fhq_learning.hypothesis_canon
            WHERE status = ANY($1)
              AND expected_timeframe_hours IS NOT NULL
              AND created_at + make_interval(hours => expected_timeframe_hours) < $2
            ",
        )
        .bind(HypothesisStatus::spellings(states))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
