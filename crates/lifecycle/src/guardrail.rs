//! Exit-coverage guardrail.
//!
//! Falsification is only trusted while the exit-detection pipeline is
//! producing ground truth. If too few realized exits closed in the look-back
//! window, every falsification write of the cycle is vetoed
//! (`LEARNING_BLOCKED`). Absence of evidence blocks; it never permits.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use fhq_core::{FalsificationConfig, OutcomeStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label recorded for every vetoed falsification.
pub const LEARNING_BLOCKED: &str = "LEARNING_BLOCKED";

/// Result of one guardrail check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailStatus {
    pub exits_in_window: i64,
    pub required_exits: i64,
    pub window_hours: i64,
    pub window_start: DateTime<Utc>,
}

impl GuardrailStatus {
    /// True when falsification writes may proceed.
    #[must_use]
    pub fn allows_falsification(&self) -> bool {
        self.exits_in_window >= self.required_exits
    }
}

pub struct ExitCoverageGuardrail<S: OutcomeStore> {
    store: Arc<S>,
    window_hours: i64,
    required_exits: i64,
}

impl<S: OutcomeStore> ExitCoverageGuardrail<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: &FalsificationConfig) -> Self {
        Self {
            store,
            window_hours: config.exit_coverage_window_hours,
            required_exits: config.min_exits_in_window,
        }
    }

    /// Counts realized exits in the window ending at `now`.
    ///
    /// # Errors
    /// Returns an error if the count query fails. Callers must treat an error
    /// as blocking.
    pub async fn check(&self, now: DateTime<Utc>) -> Result<GuardrailStatus> {
        let window_start = now - Duration::hours(self.window_hours);
        let exits_in_window = self.store.count_realized_exits_since(window_start).await?;

        Ok(GuardrailStatus {
            exits_in_window,
            required_exits: self.required_exits,
            window_hours: self.window_hours,
            window_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fhq_core::PnlType;
    use fhq_data::memory::hours_before;
    use fhq_data::{MemoryStore, ShadowTradeRecord};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_no_exits_blocks() {
        let store = Arc::new(MemoryStore::new());
        let guardrail = ExitCoverageGuardrail::new(store, &FalsificationConfig::default());

        let status = guardrail.check(clock()).await.unwrap();

        assert_eq!(status.exits_in_window, 0);
        assert!(!status.allows_falsification());
    }

    #[tokio::test]
    async fn test_old_exits_do_not_count() {
        let store = Arc::new(MemoryStore::new());
        let h = Uuid::new_v4();
        store.insert_trade(ShadowTradeRecord::closed(h, PnlType::Realized, dec!(0.01), hours_before(clock(), 49)));

        let guardrail = ExitCoverageGuardrail::new(store, &FalsificationConfig::default());
        assert!(!guardrail.check(clock()).await.unwrap().allows_falsification());
    }

    #[tokio::test]
    async fn test_counterfactual_exits_do_not_count() {
        let store = Arc::new(MemoryStore::new());
        let h = Uuid::new_v4();
        store.insert_trade(ShadowTradeRecord::closed(h, PnlType::Counterfactual, dec!(0.01), hours_before(clock(), 1)));

        let guardrail = ExitCoverageGuardrail::new(store, &FalsificationConfig::default());
        assert!(!guardrail.check(clock()).await.unwrap().allows_falsification());
    }

    #[tokio::test]
    async fn test_recent_realized_exit_opens() {
        let store = Arc::new(MemoryStore::new());
        let h = Uuid::new_v4();
        store.insert_trade(ShadowTradeRecord::closed(h, PnlType::Realized, dec!(-0.01), hours_before(clock(), 47)));

        let guardrail = ExitCoverageGuardrail::new(store, &FalsificationConfig::default());
        let status = guardrail.check(clock()).await.unwrap();

        assert_eq!(status.exits_in_window, 1);
        assert!(status.allows_falsification());
    }

    #[tokio::test]
    async fn test_configured_minimum() {
        let store = Arc::new(MemoryStore::new());
        let h = Uuid::new_v4();
        for _ in 0..2 {
            store.insert_trade(ShadowTradeRecord::closed(h, PnlType::Realized, dec!(0.01), hours_before(clock(), 2)));
        }
        let config = FalsificationConfig {
            min_exits_in_window: 3,
            ..FalsificationConfig::default()
        };

        let status = ExitCoverageGuardrail::new(store, &config).check(clock()).await.unwrap();
        assert!(!status.allows_falsification());
    }
}
