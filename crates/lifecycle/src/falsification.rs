//! Trade-based falsification daemon.
//!
//! One cycle: check the exit-coverage guardrail, evaluate the least recently
//! evaluated live hypotheses that have closed realized trades, and write
//! FALSIFIED for those the evaluator condemns. Hypotheses are processed
//! sequentially, and each is stamped as evaluated so the next bounded cycle
//! moves on to the rest. When the guardrail is closed, every condemned
//! hypothesis is reported as `LEARNING_BLOCKED` and nothing is written.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fhq_core::{
    AnnihilationReason, FalsificationConfig, HypothesisStatus, LifecycleStore, TransitionOutcome,
    TransitionRequest,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::evaluator::{Evaluation, FalsificationEvaluator, Verdict};
use crate::evidence::EvidenceWriter;
use crate::guardrail::{ExitCoverageGuardrail, GuardrailStatus, LEARNING_BLOCKED};
use crate::scheduler::{CycleSummary, Daemon};
use crate::transition::StatusTransitionWriter;

pub const DAEMON_NAME: &str = "falsification";

/// What the daemon did with one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FalsificationAction {
    Falsified,
    /// Another writer got there first.
    AlreadyHandled,
    /// Condemned, but the guardrail vetoed the write.
    LearningBlocked,
    NoChange,
}

#[derive(Debug, Clone, Serialize)]
pub struct HypothesisDecision {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    pub prior_status: HypothesisStatus,
    pub verdict: Verdict,
    pub action: FalsificationAction,
    pub closed_trades: usize,
    pub null_returns: usize,
    pub sharpe: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FalsificationSummary {
    pub governance_version: u32,
    pub min_trades_for_eval: usize,
    pub sharpe_threshold: f64,
    pub guardrail: GuardrailStatus,
    pub candidates: usize,
    pub falsified: usize,
    pub passing: usize,
    pub insufficient_data: usize,
    pub learning_blocked: usize,
    pub already_handled: usize,
    pub decisions: Vec<HypothesisDecision>,
}

impl CycleSummary for FalsificationSummary {}

impl FalsificationSummary {
    fn new(governance_version: u32, min_trades: usize, threshold: f64, guardrail: GuardrailStatus) -> Self {
        Self {
            governance_version,
            min_trades_for_eval: min_trades,
            sharpe_threshold: threshold,
            guardrail,
            candidates: 0,
            falsified: 0,
            passing: 0,
            insufficient_data: 0,
            learning_blocked: 0,
            already_handled: 0,
            decisions: Vec::new(),
        }
    }

    fn push(&mut self, decision: HypothesisDecision) {
        match decision.verdict {
            Verdict::Passing => self.passing += 1,
            Verdict::InsufficientData => self.insufficient_data += 1,
            Verdict::Falsified => {}
        }
        match decision.action {
            FalsificationAction::Falsified => self.falsified += 1,
            FalsificationAction::AlreadyHandled => self.already_handled += 1,
            FalsificationAction::LearningBlocked => self.learning_blocked += 1,
            FalsificationAction::NoChange => {}
        }
        self.decisions.push(decision);
    }
}

pub struct FalsificationDaemon<S: LifecycleStore> {
    store: Arc<S>,
    evaluator: FalsificationEvaluator<S>,
    guardrail: ExitCoverageGuardrail<S>,
    writer: StatusTransitionWriter<S>,
    max_per_cycle: u32,
    evidence: EvidenceWriter,
}

impl<S: LifecycleStore> FalsificationDaemon<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: &FalsificationConfig, evidence: EvidenceWriter) -> Self {
        Self {
            evaluator: FalsificationEvaluator::new(store.clone()),
            guardrail: ExitCoverageGuardrail::new(store.clone(), config),
            writer: StatusTransitionWriter::new(store.clone()),
            max_per_cycle: config.max_hypotheses_per_cycle,
            store,
            evidence,
        }
    }

    /// Runs one cycle as of `now` and records its evidence, failed or not.
    ///
    /// # Errors
    /// Returns an error if the guardrail, candidate, evaluation, or write
    /// queries fail. Writes already applied in this cycle stay applied.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<FalsificationSummary> {
        let started_at = Utc::now();
        let outcome = self.cycle(now).await;
        self.evidence
            .record_outcome(self.store.as_ref(), DAEMON_NAME, started_at, &outcome)
            .await;
        outcome
    }

    async fn cycle(&self, now: DateTime<Utc>) -> Result<FalsificationSummary> {
        let constants = *self.evaluator.constants();

        let guardrail = self
            .guardrail
            .check(now)
            .await
            .context("Exit-coverage guardrail check failed")?;
        let candidates = self
            .store
            .falsification_candidates(HypothesisStatus::PRE_TERMINAL, self.max_per_cycle)
            .await
            .context("Failed to load falsification candidates")?;

        info!(
            candidates = candidates.len(),
            exits_in_window = guardrail.exits_in_window,
            guardrail_open = guardrail.allows_falsification(),
            governance_version = constants.version,
            "Falsification cycle started"
        );

        let mut summary = FalsificationSummary::new(
            constants.version,
            constants.min_trades_for_eval,
            constants.sharpe_threshold,
            guardrail,
        );
        summary.candidates = candidates.len();

        for hypothesis in candidates {
            let evaluation = self
                .evaluator
                .evaluate(hypothesis.canon_id)
                .await
                .with_context(|| format!("Failed to evaluate {}", hypothesis.canon_id))?;
            self.store
                .mark_evaluated(hypothesis.canon_id, now)
                .await
                .with_context(|| format!("Failed to stamp evaluation of {}", hypothesis.canon_id))?;

            let action = match evaluation.verdict {
                Verdict::Falsified if !guardrail.allows_falsification() => {
                    warn!(
                        canon_id = %hypothesis.canon_id,
                        hypothesis_code = %hypothesis.hypothesis_code,
                        exits_in_window = guardrail.exits_in_window,
                        required_exits = guardrail.required_exits,
                        window_hours = guardrail.window_hours,
                        event = LEARNING_BLOCKED,
                        "Exit-coverage SLA unmet; falsification vetoed"
                    );
                    FalsificationAction::LearningBlocked
                }
                Verdict::Falsified => self.write_falsified(&evaluation, now).await?,
                Verdict::Passing | Verdict::InsufficientData => FalsificationAction::NoChange,
            };

            summary.push(HypothesisDecision {
                canon_id: hypothesis.canon_id,
                hypothesis_code: hypothesis.hypothesis_code,
                prior_status: hypothesis.status,
                verdict: evaluation.verdict,
                action,
                closed_trades: evaluation.stats.closed_trades,
                null_returns: evaluation.stats.null_returns,
                sharpe: evaluation.stats.sharpe,
            });
        }

        info!(
            candidates = summary.candidates,
            falsified = summary.falsified,
            passing = summary.passing,
            insufficient_data = summary.insufficient_data,
            learning_blocked = summary.learning_blocked,
            already_handled = summary.already_handled,
            "Falsification cycle finished"
        );

        Ok(summary)
    }

    async fn write_falsified(
        &self,
        evaluation: &Evaluation,
        now: DateTime<Utc>,
    ) -> Result<FalsificationAction> {
        let constants = self.evaluator.constants();
        let request = TransitionRequest {
            canon_id: evaluation.canon_id,
            reason: AnnihilationReason::trade_sharpe(
                evaluation.stats.sharpe.unwrap_or_default(),
                constants.sharpe_threshold,
                evaluation.stats.closed_trades,
                evaluation.governance_version,
            ),
            evaluated_at: now,
            allowed_from: HypothesisStatus::PRE_TERMINAL.to_vec(),
        };

        let outcome = self.writer.falsify(&request).await?;
        Ok(match outcome {
            TransitionOutcome::Applied => FalsificationAction::Falsified,
            TransitionOutcome::AlreadyHandled => FalsificationAction::AlreadyHandled,
        })
    }
}

#[async_trait]
impl<S: LifecycleStore> Daemon for FalsificationDaemon<S> {
    type Summary = FalsificationSummary;

    fn name(&self) -> &'static str {
        DAEMON_NAME
    }

    async fn run_once(&self) -> Result<FalsificationSummary> {
        self.run_at(Utc::now()).await
    }
}
