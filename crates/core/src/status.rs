//! Status vocabularies shared by every lifecycle component.
//!
//! The falsification paths and the cascade cleaner must agree byte-for-byte on
//! how each state is spelled in the database, so every spelling lives here and
//! nowhere else. Each enum round-trips through `as_str` / `parse`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LifecycleError;

/// Lifecycle state of a canonical hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HypothesisStatus {
    /// Generated but not yet promoted.
    Draft,
    /// Promoted and accumulating evidence.
    Active,
    /// Alive, but flagged by promotion logic as losing support.
    Weakened,
    /// Alive and currently passing its evaluation.
    Passing,
    /// Terminally disproven.
    Falsified,
    /// Terminally retired by promotion logic.
    Retired,
    /// Terminal on the time-based path pending a directive review.
    TimeoutPending,
}

impl HypothesisStatus {
    /// Live states from which the trade-based path may falsify.
    pub const PRE_TERMINAL: &'static [Self] =
        &[Self::Draft, Self::Active, Self::Weakened, Self::Passing];

    /// States the time-based death daemon scans.
    pub const TIMEOUT_ELIGIBLE: &'static [Self] = &[Self::Draft, Self::Active];

    /// Returns the database spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Weakened => "WEAKENED",
            Self::Passing => "PASSING",
            Self::Falsified => "FALSIFIED",
            Self::Retired => "RETIRED",
            Self::TimeoutPending => "TIMEOUT_PENDING",
        }
    }

    /// Parses the database spelling.
    ///
    /// # Errors
    /// Returns [`LifecycleError::UnknownStatus`] for any other spelling.
    pub fn parse(s: &str) -> Result<Self, LifecycleError> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "ACTIVE" => Ok(Self::Active),
            "WEAKENED" => Ok(Self::Weakened),
            "PASSING" => Ok(Self::Passing),
            "FALSIFIED" => Ok(Self::Falsified),
            "RETIRED" => Ok(Self::Retired),
            "TIMEOUT_PENDING" => Ok(Self::TimeoutPending),
            other => Err(LifecycleError::UnknownStatus {
                entity: "hypothesis",
                value: other.to_string(),
            }),
        }
    }

    /// Returns true once no lifecycle path may move the hypothesis again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Falsified | Self::Retired | Self::TimeoutPending)
    }

    /// Spells a set of states for binding into `status = ANY($n)`.
    #[must_use]
    pub fn spellings(states: &[Self]) -> Vec<String> {
        states.iter().map(|s| s.as_str().to_string()).collect()
    }
}

impl fmt::Display for HypothesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a shadow trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    Open,
    Closed,
    /// Force-closed because the owning hypothesis died.
    Expired,
}

impl TradeStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Expired => "EXPIRED",
        }
    }

    /// # Errors
    /// Returns [`LifecycleError::UnknownStatus`] for any other spelling.
    pub fn parse(s: &str) -> Result<Self, LifecycleError> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(LifecycleError::UnknownStatus {
                entity: "shadow_trade",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a trade's P&L came from live price movement or a what-if model.
///
/// Only [`PnlType::Realized`] may ever influence a falsification decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PnlType {
    Realized,
    Counterfactual,
}

impl PnlType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realized => "REALIZED",
            Self::Counterfactual => "COUNTERFACTUAL",
        }
    }

    /// # Errors
    /// Returns [`LifecycleError::UnknownStatus`] for any other spelling.
    pub fn parse(s: &str) -> Result<Self, LifecycleError> {
        match s {
            "REALIZED" => Ok(Self::Realized),
            "COUNTERFACTUAL" => Ok(Self::Counterfactual),
            other => Err(LifecycleError::UnknownStatus {
                entity: "pnl_type",
                value: other.to_string(),
            }),
        }
    }
}

/// Status of a capital-simulation ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapitalSimulationStatus {
    Open,
    Closed,
    Stopped,
}

impl CapitalSimulationStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Stopped => "STOPPED",
        }
    }

    /// # Errors
    /// Returns [`LifecycleError::UnknownStatus`] for any other spelling.
    pub fn parse(s: &str) -> Result<Self, LifecycleError> {
        match s {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "STOPPED" => Ok(Self::Stopped),
            other => Err(LifecycleError::UnknownStatus {
                entity: "capital_simulation",
                value: other.to_string(),
            }),
        }
    }
}

/// Status of an experiment registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExperimentStatus {
    Running,
    Completed,
}

impl ExperimentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
        }
    }

    /// # Errors
    /// Returns [`LifecycleError::UnknownStatus`] for any other spelling.
    pub fn parse(s: &str) -> Result<Self, LifecycleError> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            other => Err(LifecycleError::UnknownStatus {
                entity: "experiment",
                value: other.to_string(),
            }),
        }
    }
}

/// Analysis state of a post-mortem record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    Pending,
    Analyzed,
}

impl AnalysisStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Analyzed => "ANALYZED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hypothesis_status_round_trip() {
        for status in [
            HypothesisStatus::Draft,
            HypothesisStatus::Active,
            HypothesisStatus::Weakened,
            HypothesisStatus::Passing,
            HypothesisStatus::Falsified,
            HypothesisStatus::Retired,
            HypothesisStatus::TimeoutPending,
        ] {
            assert_eq!(HypothesisStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_hypothesis_status_parse_is_case_sensitive() {
        let err = HypothesisStatus::parse("falsified").unwrap_err();
        assert!(err.to_string().contains("falsified"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(HypothesisStatus::Falsified.is_terminal());
        assert!(HypothesisStatus::Retired.is_terminal());
        assert!(HypothesisStatus::TimeoutPending.is_terminal());
        assert!(!HypothesisStatus::Passing.is_terminal());
        assert!(HypothesisStatus::PRE_TERMINAL.iter().all(|s| !s.is_terminal()));
    }

    #[test]
    fn test_every_live_state_is_pre_terminal() {
        for status in [
            HypothesisStatus::Draft,
            HypothesisStatus::Active,
            HypothesisStatus::Weakened,
            HypothesisStatus::Passing,
            HypothesisStatus::Falsified,
            HypothesisStatus::Retired,
            HypothesisStatus::TimeoutPending,
        ] {
            assert_eq!(HypothesisStatus::PRE_TERMINAL.contains(&status), !status.is_terminal());
        }
    }

    #[test]
    fn test_timeout_eligible_is_subset_of_pre_terminal() {
        for s in HypothesisStatus::TIMEOUT_ELIGIBLE {
            assert!(HypothesisStatus::PRE_TERMINAL.contains(s));
        }
    }

    #[test]
    fn test_serde_uses_database_spelling() {
        let json = serde_json::to_string(&HypothesisStatus::TimeoutPending).unwrap();
        assert_eq!(json, "\"TIMEOUT_PENDING\"");
        let json = serde_json::to_string(&PnlType::Counterfactual).unwrap();
        assert_eq!(json, "\"COUNTERFACTUAL\"");
    }

    #[test]
    fn test_dependent_status_spellings() {
        assert_eq!(TradeStatus::parse("EXPIRED").unwrap(), TradeStatus::Expired);
        assert_eq!(
            CapitalSimulationStatus::parse("STOPPED").unwrap(),
            CapitalSimulationStatus::Stopped
        );
        assert_eq!(
            ExperimentStatus::parse("COMPLETED").unwrap(),
            ExperimentStatus::Completed
        );
        assert!(TradeStatus::parse("PENDING").is_err());
    }
}
