//! Row model for `fhq_learning.experiment_registry`.

use chrono::{DateTime, Utc};
use fhq_core::ExperimentStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// One controlled test run of a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExperimentRecord {
    pub experiment_id: Uuid,
    pub source_hypothesis_id: Uuid,
    pub tier: i32,
    pub parameters: Option<JsonValue>,
    pub dataset_signature: Option<String>,
    /// "RUNNING" or "COMPLETED".
    pub status: String,
    /// Terminal verdict of the hypothesis once completed.
    pub result: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExperimentRecord {
    #[must_use]
    pub fn running(source_hypothesis_id: Uuid, tier: i32, started_at: DateTime<Utc>) -> Self {
        Self {
            experiment_id: Uuid::new_v4(),
            source_hypothesis_id,
            tier,
            parameters: None,
            dataset_signature: None,
            status: ExperimentStatus::Running.as_str().to_string(),
            result: None,
            started_at,
            completed_at: None,
        }
    }
}
