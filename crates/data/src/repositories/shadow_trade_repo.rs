//! Shadow trade repository.
//!
//! Reads feed the falsification evaluator and the exit-coverage guardrail; the
//! only write is the cascade's forced expiry.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::ShadowTradeRecord;

/// Repository for `fhq_execution.shadow_trades`.
#[derive(Debug, Clone)]
pub struct ShadowTradeRepository {
    pool: PgPool,
}

impl ShadowTradeRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a shadow trade.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, record: &ShadowTradeRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO fhq_execution.shadow_trades
                (trade_id, source_hypothesis_id, status, pnl_type, shadow_return_pct,
                 shadow_pnl, entry_time, exit_time, exit_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(record.trade_id)
        .bind(record.source_hypothesis_id)
        .bind(&record.status)
        .bind(&record.pnl_type)
        .bind(record.shadow_return_pct)
        .bind(record.shadow_pnl)
        .bind(record.entry_time)
        .bind(record.exit_time)
        .bind(&record.exit_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Queries CLOSED + REALIZED trades for one hypothesis.
    ///
    /// OPEN, EXPIRED, and COUNTERFACTUAL trades are never returned.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn query_closed_realized(&self, canon_id: Uuid) -> Result<Vec<ShadowTradeRecord>> {
        let records = sqlx::query_as::<_, ShadowTradeRecord>(
            r"
            SELECT trade_id, source_hypothesis_id, status, pnl_type, shadow_return_pct,
                   shadow_pnl, entry_time, exit_time, exit_reason
            FROM fhq_execution.shadow_trades
            WHERE source_hypothesis_id = $1
              AND status = 'CLOSED'
              AND pnl_type = 'REALIZED'
            ORDER BY exit_time ASC
            ",
        )
        .bind(canon_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Counts CLOSED + REALIZED exits across all hypotheses since `since`.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn count_realized_exits_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM fhq_execution.shadow_trades
            WHERE status = 'CLOSED'
              AND pnl_type = 'REALIZED'
              AND exit_time >= $1
            ",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Forces every OPEN trade of a hypothesis to EXPIRED.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn expire_open_for_hypothesis(
        conn: &mut PgConnection,
        canon_id: Uuid,
        exit_reason: &str,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE fhq_execution.shadow_trades
            SET status = 'EXPIRED', exit_reason = $2, exit_time = $3
            WHERE source_hypothesis_id = $1 AND status = 'OPEN'
            ",
        )
        .bind(canon_id)
        .bind(exit_reason)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
