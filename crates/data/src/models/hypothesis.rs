//! Row model for `fhq_learning.hypothesis_canon`.

use chrono::{DateTime, Utc};
use fhq_core::{Hypothesis, HypothesisStatus, LifecycleError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A canonical hypothesis row as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct HypothesisRecord {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    /// Lifecycle state spelling, see [`HypothesisStatus`].
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expected_timeframe_hours: Option<i32>,
    pub generator_id: Option<String>,
    pub pre_tier_score_at_birth: Option<f64>,
    pub falsified_at: Option<DateTime<Utc>>,
    pub death_timestamp: Option<DateTime<Utc>>,
    pub annihilation_reason: Option<String>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl TryFrom<HypothesisRecord> for Hypothesis {
    type Error = LifecycleError;

    fn try_from(r: HypothesisRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            canon_id: r.canon_id,
            hypothesis_code: r.hypothesis_code,
            status: HypothesisStatus::parse(&r.status)?,
            created_at: r.created_at,
            expected_timeframe_hours: r.expected_timeframe_hours,
            generator_id: r.generator_id,
            pre_tier_score_at_birth: r.pre_tier_score_at_birth,
            falsified_at: r.falsified_at,
            death_timestamp: r.death_timestamp,
            annihilation_reason: r.annihilation_reason,
            last_evaluated_at: r.last_evaluated_at,
        })
    }
}

impl From<&Hypothesis> for HypothesisRecord {
    fn from(h: &Hypothesis) -> Self {
        Self {
            canon_id: h.canon_id,
            hypothesis_code: h.hypothesis_code.clone(),
            status: h.status.as_str().to_string(),
            created_at: h.created_at,
            expected_timeframe_hours: h.expected_timeframe_hours,
            generator_id: h.generator_id.clone(),
            pre_tier_score_at_birth: h.pre_tier_score_at_birth,
            falsified_at: h.falsified_at,
            death_timestamp: h.death_timestamp,
            annihilation_reason: h.annihilation_reason.clone(),
            last_evaluated_at: h.last_evaluated_at,
        }
    }
}

/// Converts a batch of rows, failing on the first unknown status.
///
/// # Errors
/// Returns [`LifecycleError::UnknownStatus`] if any row has an unknown status.
pub fn into_hypotheses(records: Vec<HypothesisRecord>) -> Result<Vec<Hypothesis>, LifecycleError> {
    records.into_iter().map(Hypothesis::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_round_trip() {
        let mut h = Hypothesis::new(
            "HYP-2026-0042",
            HypothesisStatus::Active,
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
            Some(72),
        );
        h.pre_tier_score_at_birth = Some(0.61);

        let record = HypothesisRecord::from(&h);
        assert_eq!(record.status, "ACTIVE");
        assert_eq!(Hypothesis::try_from(record).unwrap(), h);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let h = Hypothesis::new("HYP-X", HypothesisStatus::Draft, Utc::now(), None);
        let mut record = HypothesisRecord::from(&h);
        record.status = "ZOMBIE".to_string();

        assert!(matches!(
            Hypothesis::try_from(record),
            Err(LifecycleError::UnknownStatus { entity: "hypothesis", .. })
        ));
    }
}
