//! Structured annihilation reasons.
//!
//! The reason is persisted as free text of the form `CODE: detail`. The code
//! prefix is what downstream readers (post-mortems, reports) key on; the detail
//! is for humans.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LifecycleError;
use crate::status::HypothesisStatus;

/// Machine-readable cause of a terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// The hypothesis never declared a falsification threshold.
    ThresholdMissing,
    /// Observed outcome contradicted the predicted direction.
    OutcomeMismatch,
    /// The evidence backing the hypothesis was unusable.
    DataError,
    /// The declared validation horizon elapsed.
    Timeout,
    /// Closed realized trades produced a Sharpe-like ratio below the frozen threshold.
    TradeSharpeBelowThreshold,
}

impl ReasonCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThresholdMissing => "THRESHOLD_MISSING",
            Self::OutcomeMismatch => "OUTCOME_MISMATCH",
            Self::DataError => "DATA_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::TradeSharpeBelowThreshold => "TRADE_SHARPE_BELOW_THRESHOLD",
        }
    }

    /// # Errors
    /// Returns [`LifecycleError::UnknownReasonCode`] for any other spelling.
    pub fn parse(s: &str) -> Result<Self, LifecycleError> {
        match s {
            "THRESHOLD_MISSING" => Ok(Self::ThresholdMissing),
            "OUTCOME_MISMATCH" => Ok(Self::OutcomeMismatch),
            "DATA_ERROR" => Ok(Self::DataError),
            "TIMEOUT" => Ok(Self::Timeout),
            "TRADE_SHARPE_BELOW_THRESHOLD" => Ok(Self::TradeSharpeBelowThreshold),
            other => Err(LifecycleError::UnknownReasonCode(other.to_string())),
        }
    }
}

/// Fail reason code recorded on a post-mortem whose hypothesis has no parseable reason.
pub const UNKNOWN_REASON_CODE: &str = "UNKNOWN";

/// A reason code plus human-readable detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnihilationReason {
    pub code: ReasonCode,
    pub detail: String,
}

impl AnnihilationReason {
    #[must_use]
    pub fn new(code: ReasonCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Reason written by the trade-based path.
    #[must_use]
    pub fn trade_sharpe(
        sharpe: f64,
        threshold: f64,
        closed_trades: usize,
        governance_version: u32,
    ) -> Self {
        Self::new(
            ReasonCode::TradeSharpeBelowThreshold,
            format!(
                "trade_sharpe={sharpe:.4} < {threshold:.4} over {closed_trades} closed realized trades (governance v{governance_version})"
            ),
        )
    }

    /// Reason written by the time-based path.
    ///
    /// Distinguishes a hypothesis that never left DRAFT from one that was
    /// promoted but never validated by the market.
    #[must_use]
    pub fn horizon_expired(prior: HypothesisStatus, age_hours: f64, horizon_hours: i32) -> Self {
        let what = match prior {
            HypothesisStatus::Draft => "HORIZON_EXPIRED_NEVER_ACTIVATED: was DRAFT, never activated",
            _ => "HORIZON_EXPIRED_WITHOUT_VALIDATION: was ACTIVE, exceeded horizon without market validation",
        };
        Self::new(
            ReasonCode::Timeout,
            format!("{what} (age {age_hours:.1}h > horizon {horizon_hours}h)"),
        )
    }

    /// Parses `CODE: detail` text as stored in `annihilation_reason`.
    ///
    /// # Errors
    /// Returns [`LifecycleError::UnknownReasonCode`] if the prefix is not a known code.
    pub fn parse(text: &str) -> Result<Self, LifecycleError> {
        let (code, detail) = text.split_once(':').unwrap_or((text, ""));
        Ok(Self::new(ReasonCode::parse(code.trim())?, detail.trim()))
    }

    /// Returns the reason code spelling for a stored reason, or `UNKNOWN`.
    #[must_use]
    pub fn code_of(text: Option<&str>) -> &'static str {
        text.and_then(|t| Self::parse(t).ok())
            .map_or(UNKNOWN_REASON_CODE, |r| r.code.as_str())
    }
}

impl fmt::Display for AnnihilationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.detail)
    }
}
