//! Row model for `fhq_execution.capital_simulations`.

use chrono::{DateTime, Utc};
use fhq_core::CapitalSimulationStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A paper-capital ledger entry tied to a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CapitalSimulationRecord {
    pub simulation_id: Uuid,
    pub source_hypothesis_id: Uuid,
    /// "OPEN", "CLOSED", or "STOPPED".
    pub status: String,
    pub allocated_capital: Decimal,
    pub opened_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<String>,
}

impl CapitalSimulationRecord {
    #[must_use]
    pub fn open(source_hypothesis_id: Uuid, allocated_capital: Decimal, opened_at: DateTime<Utc>) -> Self {
        Self {
            simulation_id: Uuid::new_v4(),
            source_hypothesis_id,
            status: CapitalSimulationStatus::Open.as_str().to_string(),
            allocated_capital,
            opened_at,
            stopped_at: None,
            stop_reason: None,
        }
    }
}
