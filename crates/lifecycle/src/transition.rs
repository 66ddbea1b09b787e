//! Status transition writer.
//!
//! Applies a FALSIFIED transition exactly once. The write is conditioned on
//! the row still being in an allowed pre-terminal state; when it matches zero
//! rows the hypothesis was already handled by another writer and the call is
//! a logged no-op. The writer never touches dependents: the cascade cleaner
//! picks the hypothesis up on its next run.

use anyhow::Result;
use fhq_core::{HypothesisStore, TransitionOutcome, TransitionRequest};
use std::sync::Arc;
use tracing::{info, warn};

pub struct StatusTransitionWriter<S: HypothesisStore> {
    store: Arc<S>,
}

impl<S: HypothesisStore> StatusTransitionWriter<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Writes the transition if its predicate still holds.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn falsify(&self, request: &TransitionRequest) -> Result<TransitionOutcome> {
        let rows = self.store.falsify(request).await?;
        let outcome = TransitionOutcome::from_rows_affected(rows);

        match outcome {
            TransitionOutcome::Applied => {
                if rows > 1 {
                    warn!(canon_id = %request.canon_id, rows, "Transition matched more than one row");
                }
                info!(
                    canon_id = %request.canon_id,
                    reason = %request.reason,
                    "Hypothesis falsified"
                );
            }
            TransitionOutcome::AlreadyHandled => {
                info!(
                    canon_id = %request.canon_id,
                    "Transition matched no rows; hypothesis already handled"
                );
            }
        }

        Ok(outcome)
    }
}
