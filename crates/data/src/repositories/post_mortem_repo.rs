//! Post-mortem repository.
//!
//! Post-mortems are created at most once per hypothesis (unique `canon_id`)
//! and never overwritten.

use anyhow::Result;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::PostMortemRecord;

/// Repository for `fhq_learning.hypothesis_post_mortem`.
#[derive(Debug, Clone)]
pub struct PostMortemRepository {
    pool: PgPool,
}

impl PostMortemRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a post-mortem unless the hypothesis already has one.
    ///
    /// Returns true if a row was created.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert_if_absent(conn: &mut PgConnection, record: &PostMortemRecord) -> Result<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO fhq_learning.hypothesis_post_mortem
                (post_mortem_id, canon_id, fail_reason_code, detail, analysis_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (canon_id) DO NOTHING
            ",
        )
        .bind(record.post_mortem_id)
        .bind(record.canon_id)
        .bind(&record.fail_reason_code)
        .bind(&record.detail)
        .bind(&record.analysis_status)
        .bind(record.created_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gets the post-mortem of a hypothesis.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn get_by_canon_id(&self, canon_id: Uuid) -> Result<Option<PostMortemRecord>> {
        let record = sqlx::query_as::<_, PostMortemRecord>(
            r"
            SELECT post_mortem_id, canon_id, fail_reason_code, detail, analysis_status, created_at
            FROM fhq_learning.hypothesis_post_mortem
            WHERE canon_id = $1
            ",
        )
        .bind(canon_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
