//! `PostgreSQL` implementation of the lifecycle store traits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fhq_core::cascade::{CASCADE_SIMULATION_STOP_REASON, CASCADE_TRADE_EXIT_REASON};
use fhq_core::{
    AnnihilationReason, CascadeCounts, CascadeStore, ClosedTrade, CycleEvidence, EvidenceStore,
    Hypothesis, HypothesisStatus, HypothesisStore, OrphanedHypothesis, OutcomeStore,
    PostMortemDraft, TransitionRequest,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{into_hypotheses, PostMortemRecord};
use crate::repositories::{
    CapitalSimulationRepository, ExperimentRepository, HypothesisRepository,
    PostMortemRepository, Repositories, ShadowTradeRepository,
};

/// Snapshot of lifecycle health for operators.
#[derive(Debug, Clone)]
pub struct LifecycleOverview {
    pub status_counts: Vec<(String, i64)>,
    pub orphaned_hypotheses: usize,
    pub timeout_eligible: i64,
    pub realized_exits_in_window: i64,
}

/// Lifecycle store backed by the shared `fhq_*` schema.
#[derive(Debug, Clone)]
pub struct PgLifecycleStore {
    pool: PgPool,
    repos: Repositories,
}

impl PgLifecycleStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            repos: Repositories::new(pool.clone()),
            pool,
        }
    }

    #[must_use]
    pub fn repositories(&self) -> &Repositories {
        &self.repos
    }

    /// Collects the numbers shown by the `status` command.
    ///
    /// # Errors
    /// Returns an error if any query fails.
    pub async fn overview(
        &self,
        now: DateTime<Utc>,
        exit_window_hours: i64,
    ) -> Result<LifecycleOverview> {
        let status_counts = self.repos.hypotheses.count_by_status().await?;
        let orphaned_hypotheses = self.repos.hypotheses.query_orphaned(u32::MAX).await?.len();
        let timeout_eligible = self
            .repos
            .hypotheses
            .count_expired(HypothesisStatus::TIMEOUT_ELIGIBLE, now)
            .await?;
        let realized_exits_in_window = self
            .repos
            .shadow_trades
            .count_realized_exits_since(now - chrono::Duration::hours(exit_window_hours))
            .await?;

        Ok(LifecycleOverview {
            status_counts,
            orphaned_hypotheses,
            timeout_eligible,
            realized_exits_in_window,
        })
    }
}

#[async_trait]
impl HypothesisStore for PgLifecycleStore {
    async fn get_hypothesis(&self, canon_id: Uuid) -> Result<Option<Hypothesis>> {
        self.repos
            .hypotheses
            .get_by_id(canon_id)
            .await?
            .map(Hypothesis::try_from)
            .transpose()
            .map_err(Into::into)
    }

    async fn falsification_candidates(
        &self,
        states: &[HypothesisStatus],
        limit: u32,
    ) -> Result<Vec<Hypothesis>> {
        let records = self
            .repos
            .hypotheses
            .query_falsification_candidates(states, limit)
            .await?;
        Ok(into_hypotheses(records)?)
    }

    async fn expired_hypotheses(
        &self,
        states: &[HypothesisStatus],
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Hypothesis>> {
        let records = self.repos.hypotheses.query_expired(states, now, limit).await?;
        Ok(into_hypotheses(records)?)
    }

    async fn falsify(&self, request: &TransitionRequest) -> Result<u64> {
        self.repos.hypotheses.falsify(request).await
    }

    async fn mark_evaluated(&self, canon_id: Uuid, evaluated_at: DateTime<Utc>) -> Result<()> {
        self.repos.hypotheses.mark_evaluated(canon_id, evaluated_at).await
    }
}

#[async_trait]
impl OutcomeStore for PgLifecycleStore {
    async fn closed_realized_trades(&self, canon_id: Uuid) -> Result<Vec<ClosedTrade>> {
        let records = self.repos.shadow_trades.query_closed_realized(canon_id).await?;
        Ok(records.iter().map(ClosedTrade::from).collect())
    }

    async fn count_realized_exits_since(&self, since: DateTime<Utc>) -> Result<i64> {
        self.repos.shadow_trades.count_realized_exits_since(since).await
    }
}

#[async_trait]
impl CascadeStore for PgLifecycleStore {
    async fn find_orphaned(&self, limit: u32) -> Result<Vec<OrphanedHypothesis>> {
        self.repos.hypotheses.query_orphaned(limit).await
    }

    async fn cascade_close(
        &self,
        orphan: &OrphanedHypothesis,
        now: DateTime<Utc>,
    ) -> Result<CascadeCounts> {
        // Dropping the transaction on any `?` below rolls the whole cascade back.
        let mut tx = self.pool.begin().await?;

        let trades_expired = ShadowTradeRepository::expire_open_for_hypothesis(
            &mut *tx,
            orphan.canon_id,
            CASCADE_TRADE_EXIT_REASON,
            now,
        )
        .await
        .context("expiring shadow trades")?;

        let simulations_stopped = CapitalSimulationRepository::stop_open_for_hypothesis(
            &mut *tx,
            orphan.canon_id,
            CASCADE_SIMULATION_STOP_REASON,
            now,
        )
        .await
        .context("stopping capital simulations")?;

        let experiments_completed = ExperimentRepository::complete_running_for_hypothesis(
            &mut *tx,
            orphan.canon_id,
            HypothesisStatus::Falsified.as_str(),
            now,
        )
        .await
        .context("completing experiments")?;

        let counts = CascadeCounts {
            trades_expired,
            simulations_stopped,
            experiments_completed,
            post_mortem_created: false,
        };
        let draft = PostMortemDraft {
            canon_id: orphan.canon_id,
            fail_reason_code: AnnihilationReason::code_of(orphan.annihilation_reason.as_deref())
                .to_string(),
            detail: cascade_detail(orphan, &counts),
        };
        let record = PostMortemRecord::from_draft(&draft, now);
        let post_mortem_created = PostMortemRepository::insert_if_absent(&mut *tx, &record)
            .await
            .context("filing post-mortem")?;
        if post_mortem_created {
            HypothesisRepository::link_post_mortem(&mut *tx, orphan.canon_id, record.post_mortem_id)
                .await?;
        }

        tx.commit().await?;

        Ok(CascadeCounts {
            post_mortem_created,
            ..counts
        })
    }

    async fn falsified_without_post_mortem(&self, limit: u32) -> Result<Vec<Hypothesis>> {
        let records = self
            .repos
            .hypotheses
            .query_falsified_without_post_mortem(limit)
            .await?;
        Ok(into_hypotheses(records)?)
    }

    async fn insert_post_mortem(&self, draft: &PostMortemDraft, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let record = PostMortemRecord::from_draft(draft, now);
        let created = PostMortemRepository::insert_if_absent(&mut *tx, &record).await?;
        if created {
            HypothesisRepository::link_post_mortem(&mut *tx, draft.canon_id, record.post_mortem_id)
                .await?;
        }
        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl EvidenceStore for PgLifecycleStore {
    async fn record_evidence(&self, evidence: &CycleEvidence) -> Result<()> {
        self.repos.evidence.insert(evidence).await
    }
}

/// Detail text of a post-mortem filed by the cascade.
#[must_use]
pub fn cascade_detail(orphan: &OrphanedHypothesis, counts: &CascadeCounts) -> String {
    format!(
        "ORPHANED: {} falsified with live dependents; expired {} trades, stopped {} simulations, completed {} experiments. Reason: {}",
        orphan.hypothesis_code,
        counts.trades_expired,
        counts.simulations_stopped,
        counts.experiments_completed,
        orphan.annihilation_reason.as_deref().unwrap_or("none recorded"),
    )
}
