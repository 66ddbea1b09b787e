//! Types exchanged with the orphan-state cascade.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A FALSIFIED hypothesis whose dependents still claim to be live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedHypothesis {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    pub annihilation_reason: Option<String>,
    pub open_trades: i64,
    pub open_simulations: i64,
    pub running_experiments: i64,
}

/// Rows touched by one hypothesis's cascade transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeCounts {
    pub trades_expired: u64,
    pub simulations_stopped: u64,
    pub experiments_completed: u64,
    pub post_mortem_created: bool,
}

impl CascadeCounts {
    /// Total dependent rows closed.
    #[must_use]
    pub fn rows_closed(&self) -> u64 {
        self.trades_expired + self.simulations_stopped + self.experiments_completed
    }
}

/// A post-mortem to insert at most once per hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMortemDraft {
    pub canon_id: Uuid,
    pub fail_reason_code: String,
    pub detail: String,
}

/// Exit reason stamped on shadow trades closed by the cascade.
pub const CASCADE_TRADE_EXIT_REASON: &str = "hypothesis falsified";

/// Stop reason stamped on capital simulations closed by the cascade.
pub const CASCADE_SIMULATION_STOP_REASON: &str = "hypothesis falsified";
