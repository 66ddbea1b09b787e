//! Core types, traits, and governance constants for the hypothesis lifecycle.

pub mod cascade;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod evidence;
pub mod governance;
pub mod hypothesis;
pub mod reason;
pub mod status;
pub mod traits;

pub use cascade::{CascadeCounts, OrphanedHypothesis, PostMortemDraft};
pub use config::{
    AppConfig, DatabaseConfig, EvidenceConfig, FalsificationConfig, OrphanCleanupConfig,
    TimeDeathConfig,
};
pub use config_loader::ConfigLoader;
pub use error::LifecycleError;
pub use evidence::CycleEvidence;
pub use hypothesis::{ClosedTrade, Hypothesis, TransitionOutcome, TransitionRequest};
pub use reason::{AnnihilationReason, ReasonCode};
pub use status::{
    AnalysisStatus, CapitalSimulationStatus, ExperimentStatus, HypothesisStatus, PnlType,
    TradeStatus,
};
pub use traits::{CascadeStore, EvidenceStore, HypothesisStore, LifecycleStore, OutcomeStore};
