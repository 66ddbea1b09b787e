//! Time-based death daemon.
//!
//! Kills DRAFT and ACTIVE hypotheses whose declared horizon elapsed without
//! market validation. No performance is evaluated: expiry alone decides.
//! Each write is guarded on the status the hypothesis had when discovered, so
//! the reason text ("was DRAFT" / "was ACTIVE") is always accurate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fhq_core::{
    AnnihilationReason, EvidenceStore, HypothesisStatus, HypothesisStore, TimeDeathConfig,
    TransitionOutcome, TransitionRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::evidence::EvidenceWriter;
use crate::scheduler::{CycleSummary, Daemon};
use crate::transition::StatusTransitionWriter;

pub const DAEMON_NAME: &str = "time_death";

#[derive(Debug, Clone, Serialize)]
pub struct TimeDeath {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    pub prior_status: HypothesisStatus,
    pub age_hours: f64,
    pub horizon_hours: i32,
    pub generator_id: Option<String>,
    pub pre_tier_score_at_birth: Option<f64>,
    pub outcome: TransitionOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TimeDeathSummary {
    pub expired_found: usize,
    pub falsified: usize,
    pub already_handled: usize,
    pub from_draft: usize,
    pub from_active: usize,
    /// Deaths carrying a pre-tier score at birth. Reporting only.
    pub with_pre_tier_score: usize,
    pub deaths: Vec<TimeDeath>,
}

impl CycleSummary for TimeDeathSummary {}

pub struct TimeDeathDaemon<S: HypothesisStore + EvidenceStore> {
    store: Arc<S>,
    writer: StatusTransitionWriter<S>,
    batch_size: u32,
    evidence: EvidenceWriter,
}

impl<S: HypothesisStore + EvidenceStore> TimeDeathDaemon<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: &TimeDeathConfig, evidence: EvidenceWriter) -> Self {
        Self {
            writer: StatusTransitionWriter::new(store.clone()),
            batch_size: config.batch_size,
            store,
            evidence,
        }
    }

    /// Runs one cycle as of `now`, killing at most `batch_size` hypotheses.
    ///
    /// # Errors
    /// Returns an error if the discovery query or a write fails.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<TimeDeathSummary> {
        let started_at = Utc::now();
        let outcome = self.cycle(now).await;
        self.evidence
            .record_outcome(self.store.as_ref(), DAEMON_NAME, started_at, &outcome)
            .await;
        outcome
    }

    async fn cycle(&self, now: DateTime<Utc>) -> Result<TimeDeathSummary> {
        let expired = self
            .store
            .expired_hypotheses(HypothesisStatus::TIMEOUT_ELIGIBLE, now, self.batch_size)
            .await
            .context("Failed to load expired hypotheses")?;

        info!(expired = expired.len(), batch_size = self.batch_size, "Time-death cycle started");

        let mut summary = TimeDeathSummary {
            expired_found: expired.len(),
            ..TimeDeathSummary::default()
        };

        for hypothesis in expired {
            let Some(horizon_hours) = hypothesis.expected_timeframe_hours else {
                continue;
            };
            let age_hours = hypothesis.age_hours(now);
            let request = TransitionRequest {
                canon_id: hypothesis.canon_id,
                reason: AnnihilationReason::horizon_expired(hypothesis.status, age_hours, horizon_hours),
                evaluated_at: now,
                allowed_from: vec![hypothesis.status],
            };

            let outcome = self.writer.falsify(&request).await?;
            if outcome == TransitionOutcome::Applied {
                summary.falsified += 1;
                match hypothesis.status {
                    HypothesisStatus::Draft => summary.from_draft += 1,
                    _ => summary.from_active += 1,
                }
                if hypothesis.pre_tier_score_at_birth.is_some() {
                    summary.with_pre_tier_score += 1;
                }
            } else {
                summary.already_handled += 1;
            }

            summary.deaths.push(TimeDeath {
                canon_id: hypothesis.canon_id,
                hypothesis_code: hypothesis.hypothesis_code,
                prior_status: hypothesis.status,
                age_hours,
                horizon_hours,
                generator_id: hypothesis.generator_id,
                pre_tier_score_at_birth: hypothesis.pre_tier_score_at_birth,
                outcome,
            });
        }

        info!(
            falsified = summary.falsified,
            from_draft = summary.from_draft,
            from_active = summary.from_active,
            with_pre_tier_score = summary.with_pre_tier_score,
            already_handled = summary.already_handled,
            "Time-death cycle finished"
        );

        Ok(summary)
    }
}

#[async_trait]
impl<S: HypothesisStore + EvidenceStore> Daemon for TimeDeathDaemon<S> {
    type Summary = TimeDeathSummary;

    fn name(&self) -> &'static str {
        DAEMON_NAME
    }

    async fn run_once(&self) -> Result<TimeDeathSummary> {
        self.run_at(Utc::now()).await
    }
}
