//! Row model for `fhq_execution.shadow_trades`.
//!
//! Shadow trades are opened and closed by the execution simulator; the
//! lifecycle core only reads them, except for forcing OPEN trades of a dead
//! hypothesis to EXPIRED.

use chrono::{DateTime, Utc};
use fhq_core::{ClosedTrade, PnlType, TradeStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A simulated position opened in the name of a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShadowTradeRecord {
    pub trade_id: Uuid,
    /// Lookup key of the hypothesis; not an ownership relation.
    pub source_hypothesis_id: Uuid,
    /// "OPEN", "CLOSED", or "EXPIRED".
    pub status: String,
    /// "REALIZED" or "COUNTERFACTUAL".
    pub pnl_type: String,
    pub shadow_return_pct: Option<Decimal>,
    pub shadow_pnl: Option<Decimal>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_reason: Option<String>,
}

impl ShadowTradeRecord {
    /// A trade that is still open.
    #[must_use]
    pub fn open(source_hypothesis_id: Uuid, pnl_type: PnlType, entry_time: DateTime<Utc>) -> Self {
        Self {
            trade_id: Uuid::new_v4(),
            source_hypothesis_id,
            status: TradeStatus::Open.as_str().to_string(),
            pnl_type: pnl_type.as_str().to_string(),
            shadow_return_pct: None,
            shadow_pnl: None,
            entry_time,
            exit_time: None,
            exit_reason: None,
        }
    }

    /// A trade closed with the given return.
    #[must_use]
    pub fn closed(
        source_hypothesis_id: Uuid,
        pnl_type: PnlType,
        shadow_return_pct: Decimal,
        exit_time: DateTime<Utc>,
    ) -> Self {
        Self {
            status: TradeStatus::Closed.as_str().to_string(),
            shadow_return_pct: Some(shadow_return_pct),
            exit_time: Some(exit_time),
            exit_reason: Some("target reached".to_string()),
            ..Self::open(source_hypothesis_id, pnl_type, exit_time)
        }
    }

    /// Returns true if this trade counts as falsification evidence.
    #[must_use]
    pub fn is_closed_realized(&self) -> bool {
        self.status == TradeStatus::Closed.as_str() && self.pnl_type == PnlType::Realized.as_str()
    }
}

impl From<&ShadowTradeRecord> for ClosedTrade {
    fn from(t: &ShadowTradeRecord) -> Self {
        Self {
            trade_id: t.trade_id,
            shadow_return_pct: t.shadow_return_pct,
            shadow_pnl: t.shadow_pnl,
            exit_time: t.exit_time,
        }
    }
}
