//! Storage seams of the lifecycle daemons.
//!
//! Every mutating method is predicate-guarded: it only touches rows still in
//! the state the caller expects and reports how many rows it actually changed.
//! Zero means "already handled", never an error.

use crate::cascade::{CascadeCounts, OrphanedHypothesis, PostMortemDraft};
use crate::evidence::CycleEvidence;
use crate::hypothesis::{ClosedTrade, Hypothesis, TransitionRequest};
use crate::status::HypothesisStatus;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait HypothesisStore: Send + Sync {
    async fn get_hypothesis(&self, canon_id: Uuid) -> Result<Option<Hypothesis>>;

    /// Live hypotheses with at least one CLOSED + REALIZED trade.
    ///
    /// Never-evaluated hypotheses come first, then the least recently
    /// evaluated; ties fall back to creation time.
    async fn falsification_candidates(
        &self,
        states: &[HypothesisStatus],
        limit: u32,
    ) -> Result<Vec<Hypothesis>>;

    /// Hypotheses in `states` whose declared horizon elapsed before `now`, oldest first.
    async fn expired_hypotheses(
        &self,
        states: &[HypothesisStatus],
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Hypothesis>>;

    /// Moves one hypothesis to FALSIFIED if it is still in `allowed_from`.
    ///
    /// Returns the number of rows changed (0 or 1).
    async fn falsify(&self, request: &TransitionRequest) -> Result<u64>;

    /// Stamps the time the trade-based path last judged `canon_id`.
    async fn mark_evaluated(&self, canon_id: Uuid, evaluated_at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Trades with `status = CLOSED` and `pnl_type = REALIZED` for one hypothesis.
    async fn closed_realized_trades(&self, canon_id: Uuid) -> Result<Vec<ClosedTrade>>;

    /// CLOSED + REALIZED exits across all hypotheses since `since`.
    async fn count_realized_exits_since(&self, since: DateTime<Utc>) -> Result<i64>;
}

#[async_trait]
pub trait CascadeStore: Send + Sync {
    /// FALSIFIED hypotheses with an OPEN trade, OPEN simulation, or RUNNING experiment.
    async fn find_orphaned(&self, limit: u32) -> Result<Vec<OrphanedHypothesis>>;

    /// Closes every live dependent of one hypothesis and files its post-mortem,
    /// all in one transaction.
    async fn cascade_close(
        &self,
        orphan: &OrphanedHypothesis,
        now: DateTime<Utc>,
    ) -> Result<CascadeCounts>;

    /// FALSIFIED hypotheses that have no post-mortem yet.
    async fn falsified_without_post_mortem(&self, limit: u32) -> Result<Vec<Hypothesis>>;

    /// Inserts a post-mortem unless one exists. Returns true if a row was created.
    async fn insert_post_mortem(&self, draft: &PostMortemDraft, now: DateTime<Utc>) -> Result<bool>;
}

#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Appends one cycle's evidence to durable storage.
    async fn record_evidence(&self, evidence: &CycleEvidence) -> Result<()>;
}

/// Everything a lifecycle daemon may need from storage.
pub trait LifecycleStore: HypothesisStore + OutcomeStore + CascadeStore + EvidenceStore {}

impl<T> LifecycleStore for T where T: HypothesisStore + OutcomeStore + CascadeStore + EvidenceStore {}
