//! Storage for the hypothesis lifecycle.
//!
//! This crate provides:
//! - Database client and migrations for the `fhq_learning` / `fhq_execution` schemas
//! - Row models for hypotheses and their dependents
//! - Repositories for typed database access
//! - `PgLifecycleStore`, the production implementation of the core store traits
//! - `MemoryStore` (feature `test-util`), an in-memory implementation with the
//!   same write predicates

pub mod database;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod models;
pub mod pg_store;
pub mod repositories;

pub use database::DatabaseClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use models::{
    CapitalSimulationRecord, ExperimentRecord, HypothesisRecord, PostMortemRecord,
    ShadowTradeRecord,
};
pub use pg_store::{LifecycleOverview, PgLifecycleStore};
pub use repositories::{
    CapitalSimulationRepository, EvidenceRepository, ExperimentRepository, HypothesisRepository,
    PostMortemRepository, Repositories, ShadowTradeRepository,
};
