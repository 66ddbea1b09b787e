//! Governance-frozen falsification constants.
//!
//! ============================================================================
//! FROZEN. These values decide when real trading evidence kills a hypothesis.
//! They are not configuration: no file, flag, or environment variable can
//! change them. A change requires an out-of-band governance approval, a new
//! entry appended to `GOVERNANCE_LEDGER`, and `ACTIVE_GOVERNANCE_VERSION`
//! pointing at it. Never edit an existing entry.
//! ============================================================================

use serde::Serialize;

/// One approved version of the falsification constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GovernanceConstants {
    pub version: u32,
    /// Minimum closed realized trades before a Sharpe-like ratio is trusted.
    pub min_trades_for_eval: usize,
    /// A ratio strictly below this falsifies.
    pub sharpe_threshold: f64,
    /// Why this version exists.
    pub changelog: &'static str,
}

/// Append-only history of approved constants.
pub const GOVERNANCE_LEDGER: &[GovernanceConstants] = &[
    GovernanceConstants {
        version: 1,
        min_trades_for_eval: 5,
        sharpe_threshold: 0.0,
        changelog: "Initial trade-based falsification gate.",
    },
    GovernanceConstants {
        version: 2,
        min_trades_for_eval: 30,
        sharpe_threshold: 0.0,
        changelog: "Minimum sample raised 5 -> 30; five trades killed hypotheses on noise.",
    },
];

/// The version every evaluator uses.
pub const ACTIVE_GOVERNANCE_VERSION: u32 = 2;

/// Minimum closed realized trades for the active version.
pub const MIN_TRADES_FOR_EVAL: usize = active().min_trades_for_eval;

/// Sharpe-like threshold for the active version.
pub const SHARPE_THRESHOLD: f64 = active().sharpe_threshold;

/// Denominator substituted when realized returns have zero variance.
pub const ZERO_VARIANCE_EPSILON: f64 = 0.0001;

/// Returns the active constants.
#[must_use]
pub const fn active() -> GovernanceConstants {
    let mut i = 0;
    while i < GOVERNANCE_LEDGER.len() {
        if GOVERNANCE_LEDGER[i].version == ACTIVE_GOVERNANCE_VERSION {
            return GOVERNANCE_LEDGER[i];
        }
        i += 1;
    }
    panic!("ACTIVE_GOVERNANCE_VERSION is not in GOVERNANCE_LEDGER");
}

/// Looks up a historical version.
#[must_use]
pub fn version(version: u32) -> Option<GovernanceConstants> {
    GOVERNANCE_LEDGER.iter().copied().find(|c| c.version == version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_version_values() {
        assert_eq!(MIN_TRADES_FOR_EVAL, 30);
        assert!((SHARPE_THRESHOLD - 0.0).abs() < f64::EPSILON);
        assert_eq!(active().version, ACTIVE_GOVERNANCE_VERSION);
    }

    #[test]
    fn test_ledger_versions_strictly_increase() {
        for pair in GOVERNANCE_LEDGER.windows(2) {
            assert!(pair[1].version > pair[0].version);
        }
    }

    #[test]
    fn test_every_entry_has_changelog() {
        assert!(GOVERNANCE_LEDGER.iter().all(|c| !c.changelog.is_empty()));
    }

    #[test]
    fn test_historical_lookup() {
        assert_eq!(version(1).map(|c| c.min_trades_for_eval), Some(5));
        assert!(version(99).is_none());
    }
}
