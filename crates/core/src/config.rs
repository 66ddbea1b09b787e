use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::LifecycleError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub falsification: FalsificationConfig,
    pub time_death: TimeDeathConfig,
    pub orphan_cleanup: OrphanCleanupConfig,
    pub evidence: EvidenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Tunables of the trade-based falsification daemon.
///
/// The minimum sample and Sharpe threshold are deliberately absent; see
/// [`crate::governance`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FalsificationConfig {
    pub interval_secs: u64,
    pub max_hypotheses_per_cycle: u32,
    /// Look-back window of the exit-coverage guardrail.
    pub exit_coverage_window_hours: i64,
    /// Realized exits required inside the window before any falsification.
    pub min_exits_in_window: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDeathConfig {
    pub interval_secs: u64,
    pub batch_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrphanCleanupConfig {
    pub interval_secs: u64,
    pub max_orphans_per_cycle: u32,
    pub max_post_mortem_backfill: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Directory receiving one JSON file per cycle; `None` disables files.
    pub dir: Option<PathBuf>,
    /// Also append each cycle to the evidence table.
    pub write_to_database: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/fhq".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for FalsificationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            max_hypotheses_per_cycle: 500,
            exit_coverage_window_hours: 48,
            min_exits_in_window: 1,
        }
    }
}

impl Default for TimeDeathConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            batch_size: 50,
        }
    }
}

impl Default for OrphanCleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            max_orphans_per_cycle: 200,
            max_post_mortem_backfill: 200,
        }
    }
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("evidence")),
            write_to_database: true,
        }
    }
}

impl AppConfig {
    /// Rejects values that would make a daemon spin, stall, or fail open.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        let checks: [(bool, &'static str, &'static str); 9] = [
            (self.database.max_connections == 0, "database.max_connections", "must be at least 1"),
            (self.falsification.interval_secs == 0, "falsification.interval_secs", "must be positive"),
            (self.falsification.max_hypotheses_per_cycle == 0, "falsification.max_hypotheses_per_cycle", "must be positive"),
            (self.falsification.exit_coverage_window_hours <= 0, "falsification.exit_coverage_window_hours", "must be positive"),
            (self.falsification.min_exits_in_window < 1, "falsification.min_exits_in_window", "must be at least 1"),
            (self.time_death.interval_secs == 0, "time_death.interval_secs", "must be positive"),
            (self.time_death.batch_size == 0, "time_death.batch_size", "must be positive"),
            (self.orphan_cleanup.interval_secs == 0, "orphan_cleanup.interval_secs", "must be positive"),
            (self.orphan_cleanup.max_orphans_per_cycle == 0, "orphan_cleanup.max_orphans_per_cycle", "must be positive"),
        ];

        match checks.iter().find(|(bad, _, _)| *bad) {
            Some(&(_, field, problem)) => Err(LifecycleError::InvalidConfig { field, problem }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_guardrail_cannot_be_configured_open() {
        let mut config = AppConfig::default();
        config.falsification.min_exits_in_window = 0;

        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            LifecycleError::InvalidConfig {
                field: "falsification.min_exits_in_window",
                problem: "must be at least 1",
            }
        );
    }

    #[test]
    fn test_zero_batch_rejected() {
        let mut config = AppConfig::default();
        config.time_death.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_guardrail_window_is_48_hours() {
        let config = FalsificationConfig::default();
        assert_eq!(config.exit_coverage_window_hours, 48);
        assert_eq!(config.min_exits_in_window, 1);
    }
}
