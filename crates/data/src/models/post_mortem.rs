//! Row model for `fhq_learning.hypothesis_post_mortem`.

use chrono::{DateTime, Utc};
use fhq_core::{AnalysisStatus, PostMortemDraft};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permanent record of why a hypothesis died. At most one per hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostMortemRecord {
    pub post_mortem_id: Uuid,
    pub canon_id: Uuid,
    pub fail_reason_code: String,
    pub detail: String,
    pub analysis_status: String,
    pub created_at: DateTime<Utc>,
}

impl PostMortemRecord {
    /// Materializes a draft as a new, unanalyzed record.
    #[must_use]
    pub fn from_draft(draft: &PostMortemDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            post_mortem_id: Uuid::new_v4(),
            canon_id: draft.canon_id,
            fail_reason_code: draft.fail_reason_code.clone(),
            detail: draft.detail.clone(),
            analysis_status: AnalysisStatus::Pending.as_str().to_string(),
            created_at,
        }
    }
}
