//! Per-cycle evidence records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Timestamped, serializable record of what one daemon cycle saw and changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleEvidence {
    pub cycle_id: Uuid,
    pub daemon: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: JsonValue,
}

impl CycleEvidence {
    /// Captures a daemon summary.
    ///
    /// # Errors
    /// Returns an error if the summary cannot be serialized.
    pub fn capture<S: Serialize>(
        daemon: &str,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        summary: &S,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            cycle_id: Uuid::new_v4(),
            daemon: daemon.to_string(),
            started_at,
            finished_at,
            summary: serde_json::to_value(summary)?,
        })
    }
}
