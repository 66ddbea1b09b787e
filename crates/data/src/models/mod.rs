//! Row models for the lifecycle tables.
//!
//! Status columns are kept as their stored spelling and converted to the
//! shared enums in `fhq_core::status` at the repository boundary.

pub mod capital_simulation;
pub mod experiment;
pub mod hypothesis;
pub mod post_mortem;
pub mod shadow_trade;

pub use capital_simulation::CapitalSimulationRecord;
pub use experiment::ExperimentRecord;
pub use hypothesis::{into_hypotheses, HypothesisRecord};
pub use post_mortem::PostMortemRecord;
pub use shadow_trade::ShadowTradeRecord;
