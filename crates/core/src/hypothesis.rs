//! Domain view of a canonical hypothesis and its transitions.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reason::AnnihilationReason;
use crate::status::HypothesisStatus;

/// A canonical hypothesis as the lifecycle daemons see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    pub status: HypothesisStatus,
    pub created_at: DateTime<Utc>,
    /// Declared validation horizon; `None` means the hypothesis never times out.
    pub expected_timeframe_hours: Option<i32>,
    /// Subsystem that generated the hypothesis.
    pub generator_id: Option<String>,
    /// Score assigned before tiering, if the generator recorded one.
    pub pre_tier_score_at_birth: Option<f64>,
    pub falsified_at: Option<DateTime<Utc>>,
    pub death_timestamp: Option<DateTime<Utc>>,
    pub annihilation_reason: Option<String>,
    /// Last time the trade-based path judged this hypothesis; candidates
    /// rotate on it so a bounded cycle reaches every live hypothesis.
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

impl Hypothesis {
    /// A freshly generated hypothesis with no terminal fields set.
    #[must_use]
    pub fn new(
        hypothesis_code: impl Into<String>,
        status: HypothesisStatus,
        created_at: DateTime<Utc>,
        expected_timeframe_hours: Option<i32>,
    ) -> Self {
        Self {
            canon_id: Uuid::new_v4(),
            hypothesis_code: hypothesis_code.into(),
            status,
            created_at,
            expected_timeframe_hours,
            generator_id: None,
            pre_tier_score_at_birth: None,
            falsified_at: None,
            death_timestamp: None,
            annihilation_reason: None,
            last_evaluated_at: None,
        }
    }

    /// Instant after which the declared horizon has elapsed.
    #[must_use]
    pub fn horizon_deadline(&self) -> Option<DateTime<Utc>> {
        self.expected_timeframe_hours
            .map(|h| self.created_at + Duration::hours(i64::from(h)))
    }

    /// Returns true if `now` is strictly past the declared horizon.
    #[must_use]
    pub fn is_past_horizon(&self, now: DateTime<Utc>) -> bool {
        self.horizon_deadline().is_some_and(|deadline| now > deadline)
    }

    /// Age in fractional hours at `now`.
    #[must_use]
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_seconds() as f64 / 3600.0
    }
}

/// A CLOSED + REALIZED shadow trade, the only kind that counts as evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub trade_id: Uuid,
    /// `None` when the recorder closed the trade without a return.
    pub shadow_return_pct: Option<Decimal>,
    pub shadow_pnl: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
}

/// A predicate-guarded request to move a hypothesis to FALSIFIED.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub canon_id: Uuid,
    pub reason: AnnihilationReason,
    /// Evaluation time; recorded as both `falsified_at` and `death_timestamp`.
    pub evaluated_at: DateTime<Utc>,
    /// The write only applies while the row is in one of these states.
    pub allowed_from: Vec<HypothesisStatus>,
}

/// Result of a predicate-guarded status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionOutcome {
    /// Exactly one row moved to FALSIFIED.
    Applied,
    /// The predicate no longer matched; another writer got there first.
    AlreadyHandled,
}

impl TransitionOutcome {
    /// Interprets the affected-row count of the guarded UPDATE.
    #[must_use]
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 {
            Self::AlreadyHandled
        } else {
            Self::Applied
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(created_at: DateTime<Utc>, horizon: Option<i32>) -> Hypothesis {
        Hypothesis::new("HYP-TEST-001", HypothesisStatus::Draft, created_at, horizon)
    }

    #[test]
    fn test_horizon_boundary_is_strict() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let h = sample(created, Some(24));

        assert!(!h.is_past_horizon(created + Duration::hours(24)));
        assert!(h.is_past_horizon(created + Duration::hours(24) + Duration::seconds(1)));
    }

    #[test]
    fn test_no_horizon_never_expires() {
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let h = sample(created, None);
        assert!(!h.is_past_horizon(Utc::now()));
    }

    #[test]
    fn test_age_hours() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let h = sample(created, Some(24));
        assert!((h.age_hours(created + Duration::minutes(90)) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_transition_outcome_from_rows() {
        assert_eq!(TransitionOutcome::from_rows_affected(0), TransitionOutcome::AlreadyHandled);
        assert_eq!(TransitionOutcome::from_rows_affected(1), TransitionOutcome::Applied);
    }
}
