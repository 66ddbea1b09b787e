//! Hypothesis lifecycle daemons.
//!
//! This crate provides:
//! - `FalsificationEvaluator`: trade-based Sharpe verdicts under frozen governance constants
//! - `ExitCoverageGuardrail`: fail-closed veto when realized exits stall
//! - `StatusTransitionWriter`: predicate-guarded FALSIFIED writes
//! - `FalsificationDaemon`, `TimeDeathDaemon`, `OrphanCascadeCleaner`
//! - `run_continuous`: the interval loop shared by all daemons
//! - `EvidenceWriter`: per-cycle audit records

pub mod evaluator;
pub mod evidence;
pub mod falsification;
pub mod guardrail;
pub mod orphan_cleaner;
pub mod scheduler;
pub mod time_death;
pub mod transition;

pub use evaluator::{Evaluation, FalsificationEvaluator, TradeStats, Verdict};
pub use evidence::{EvidenceError, EvidenceWriter, FailedCycle};
pub use falsification::{FalsificationAction, FalsificationDaemon, FalsificationSummary};
pub use guardrail::{ExitCoverageGuardrail, GuardrailStatus, LEARNING_BLOCKED};
pub use orphan_cleaner::{OrphanCascadeCleaner, OrphanCleanupSummary};
pub use scheduler::{run_continuous, CycleSummary, Daemon};
pub use time_death::{TimeDeathDaemon, TimeDeathSummary};
pub use transition::StatusTransitionWriter;
