//! Orphan-state cascade cleaner.
//!
//! Finds FALSIFIED hypotheses whose dependents still claim to be live and
//! closes them: OPEN shadow trades become EXPIRED, OPEN capital simulations
//! become STOPPED, RUNNING experiments become COMPLETED with result FALSIFIED.
//! Each hypothesis is cleaned in its own transaction; a failure is logged and
//! the cycle moves on. Afterwards every FALSIFIED hypothesis still lacking a
//! post-mortem gets one.
//!
//! Every write is keyed on the dependent's current state, so a second run
//! with no new falsifications finds nothing and changes nothing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fhq_core::{
    AnnihilationReason, CascadeCounts, CascadeStore, EvidenceStore, OrphanCleanupConfig,
    PostMortemDraft,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::evidence::EvidenceWriter;
use crate::scheduler::{CycleSummary, Daemon};

pub const DAEMON_NAME: &str = "orphan_cleanup";

#[derive(Debug, Clone, Serialize)]
pub struct CascadeReport {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    pub counts: CascadeCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct CascadeFailure {
    pub canon_id: Uuid,
    pub hypothesis_code: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OrphanCleanupSummary {
    pub orphans_found: usize,
    pub cleaned: usize,
    pub failed: usize,
    pub trades_expired: u64,
    pub simulations_stopped: u64,
    pub experiments_completed: u64,
    pub post_mortems_created: usize,
    pub post_mortems_backfilled: usize,
    pub cascades: Vec<CascadeReport>,
    pub failures: Vec<CascadeFailure>,
    /// Set when the backfill pass could not run at all.
    pub backfill_error: Option<String>,
}

impl OrphanCleanupSummary {
    /// Total dependent rows changed this cycle.
    #[must_use]
    pub fn rows_closed(&self) -> u64 {
        self.trades_expired + self.simulations_stopped + self.experiments_completed
    }
}

impl CycleSummary for OrphanCleanupSummary {
    fn had_failures(&self) -> bool {
        !self.failures.is_empty() || self.backfill_error.is_some()
    }
}

pub struct OrphanCascadeCleaner<S: CascadeStore + EvidenceStore> {
    store: Arc<S>,
    max_orphans: u32,
    max_backfill: u32,
    evidence: EvidenceWriter,
}

impl<S: CascadeStore + EvidenceStore> OrphanCascadeCleaner<S> {
    #[must_use]
    pub fn new(store: Arc<S>, config: &OrphanCleanupConfig, evidence: EvidenceWriter) -> Self {
        Self {
            store,
            max_orphans: config.max_orphans_per_cycle,
            max_backfill: config.max_post_mortem_backfill,
            evidence,
        }
    }

    /// Runs one cleanup cycle as of `now`.
    ///
    /// # Errors
    /// Returns an error only if orphan discovery fails. Per-hypothesis
    /// cascade failures are isolated and reported in the summary.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<OrphanCleanupSummary> {
        let started_at = Utc::now();
        let outcome = self.cycle(now).await;
        self.evidence
            .record_outcome(self.store.as_ref(), DAEMON_NAME, started_at, &outcome)
            .await;
        outcome
    }

    async fn cycle(&self, now: DateTime<Utc>) -> Result<OrphanCleanupSummary> {
        let orphans = self
            .store
            .find_orphaned(self.max_orphans)
            .await
            .context("Failed to discover orphaned hypotheses")?;

        info!(orphans_found = orphans.len(), "Orphan cleanup cycle started");

        let mut summary = OrphanCleanupSummary {
            orphans_found: orphans.len(),
            ..OrphanCleanupSummary::default()
        };

        for orphan in orphans {
            match self.store.cascade_close(&orphan, now).await {
                Ok(counts) => {
                    info!(
                        canon_id = %orphan.canon_id,
                        hypothesis_code = %orphan.hypothesis_code,
                        trades_expired = counts.trades_expired,
                        simulations_stopped = counts.simulations_stopped,
                        experiments_completed = counts.experiments_completed,
                        post_mortem_created = counts.post_mortem_created,
                        "Cascade committed"
                    );
                    summary.cleaned += 1;
                    summary.trades_expired += counts.trades_expired;
                    summary.simulations_stopped += counts.simulations_stopped;
                    summary.experiments_completed += counts.experiments_completed;
                    if counts.post_mortem_created {
                        summary.post_mortems_created += 1;
                    }
                    summary.cascades.push(CascadeReport {
                        canon_id: orphan.canon_id,
                        hypothesis_code: orphan.hypothesis_code,
                        counts,
                    });
                }
                Err(e) => {
                    error!(
                        canon_id = %orphan.canon_id,
                        hypothesis_code = %orphan.hypothesis_code,
                        error = %format!("{e:#}"),
                        "Cascade failed; continuing with next hypothesis"
                    );
                    summary.failed += 1;
                    summary.failures.push(CascadeFailure {
                        canon_id: orphan.canon_id,
                        hypothesis_code: orphan.hypothesis_code,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        if let Err(e) = self.backfill_post_mortems(now, &mut summary).await {
            error!(error = %format!("{e:#}"), "Post-mortem backfill failed");
            summary.backfill_error = Some(format!("{e:#}"));
        }

        info!(
            orphans_found = summary.orphans_found,
            cleaned = summary.cleaned,
            failed = summary.failed,
            trades_expired = summary.trades_expired,
            simulations_stopped = summary.simulations_stopped,
            experiments_completed = summary.experiments_completed,
            post_mortems_created = summary.post_mortems_created,
            post_mortems_backfilled = summary.post_mortems_backfilled,
            "Orphan cleanup cycle finished"
        );

        Ok(summary)
    }

    async fn backfill_post_mortems(
        &self,
        now: DateTime<Utc>,
        summary: &mut OrphanCleanupSummary,
    ) -> Result<()> {
        let missing = self
            .store
            .falsified_without_post_mortem(self.max_backfill)
            .await
            .context("Failed to list hypotheses without post-mortem")?;

        for hypothesis in missing {
            let draft = PostMortemDraft {
                canon_id: hypothesis.canon_id,
                fail_reason_code: AnnihilationReason::code_of(hypothesis.annihilation_reason.as_deref())
                    .to_string(),
                detail: format!(
                    "Backfilled for {}: {}",
                    hypothesis.hypothesis_code,
                    hypothesis
                        .annihilation_reason
                        .as_deref()
                        .unwrap_or("no annihilation reason recorded")
                ),
            };

            match self.store.insert_post_mortem(&draft, now).await {
                Ok(true) => summary.post_mortems_backfilled += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    canon_id = %hypothesis.canon_id,
                    error = %format!("{e:#}"),
                    "Post-mortem insert failed; retrying next cycle"
                ),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<S: CascadeStore + EvidenceStore> Daemon for OrphanCascadeCleaner<S> {
    type Summary = OrphanCleanupSummary;

    fn name(&self) -> &'static str {
        DAEMON_NAME
    }

    async fn run_once(&self) -> Result<OrphanCleanupSummary> {
        self.run_at(Utc::now()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fhq_core::{
        AnalysisStatus, CapitalSimulationStatus, ExperimentStatus, Hypothesis, HypothesisStatus,
        HypothesisStore, PnlType, TradeStatus, TransitionRequest,
    };
    use fhq_data::memory::hours_before;
    use fhq_data::{CapitalSimulationRecord, ExperimentRecord, MemoryStore, ShadowTradeRecord};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn cleaner(store: &Arc<MemoryStore>) -> OrphanCascadeCleaner<MemoryStore> {
        OrphanCascadeCleaner::new(store.clone(), &OrphanCleanupConfig::default(), EvidenceWriter::disabled())
    }

    async fn falsified_hypothesis(store: &MemoryStore, code: &str) -> Uuid {
        let id = store.insert_hypothesis(Hypothesis::new(
            code,
            HypothesisStatus::Active,
            hours_before(clock(), 200),
            None,
        ));
        store
            .falsify(&TransitionRequest {
                canon_id: id,
                reason: AnnihilationReason::trade_sharpe(-1.3, 0.0, 30, 2),
                evaluated_at: hours_before(clock(), 2),
                allowed_from: HypothesisStatus::PRE_TERMINAL.to_vec(),
            })
            .await
            .unwrap();
        id
    }

    fn seed_dependents(store: &MemoryStore, id: Uuid) {
        store.insert_trade(ShadowTradeRecord::open(id, PnlType::Realized, hours_before(clock(), 5)));
        store.insert_simulation(CapitalSimulationRecord::open(id, dec!(10000), hours_before(clock(), 5)));
        store.insert_experiment(ExperimentRecord::running(id, 1, hours_before(clock(), 5)));
    }

    // =========================================================================
    // Cascade
    // =========================================================================

    #[tokio::test]
    async fn test_cascade_completeness() {
        let store = Arc::new(MemoryStore::new());
        let id = falsified_hypothesis(&store, "HYP-DEAD").await;
        seed_dependents(&store, id);

        let summary = cleaner(&store).run_at(clock()).await.unwrap();

        assert_eq!(summary.orphans_found, 1);
        assert_eq!(summary.cleaned, 1);
        assert_eq!(summary.rows_closed(), 3);

        let trade = &store.trades_for(id)[0];
        assert_eq!(trade.status, TradeStatus::Expired.as_str());
        assert_eq!(trade.exit_reason.as_deref(), Some("hypothesis falsified"));
        assert_eq!(trade.exit_time, Some(clock()));

        assert_eq!(store.simulations_for(id)[0].status, CapitalSimulationStatus::Stopped.as_str());

        let experiment = &store.experiments_for(id)[0];
        assert_eq!(experiment.status, ExperimentStatus::Completed.as_str());
        assert_eq!(experiment.result.as_deref(), Some("FALSIFIED"));

        let post_mortems = store.post_mortems_for(id);
        assert_eq!(post_mortems.len(), 1);
        assert_eq!(post_mortems[0].fail_reason_code, "TRADE_SHARPE_BELOW_THRESHOLD");
        assert_eq!(post_mortems[0].analysis_status, AnalysisStatus::Pending.as_str());
        assert_eq!(summary.post_mortems_created, 1);
        assert_eq!(summary.post_mortems_backfilled, 0);
    }

    #[tokio::test]
    async fn test_second_run_is_empty() {
        let store = Arc::new(MemoryStore::new());
        let id = falsified_hypothesis(&store, "HYP-DEAD").await;
        seed_dependents(&store, id);
        let cleaner = cleaner(&store);
        cleaner.run_at(clock()).await.unwrap();
        let trades_after_first = store.trades_for(id);

        let second = cleaner.run_at(clock() + chrono::Duration::hours(1)).await.unwrap();

        assert_eq!(second.orphans_found, 0);
        assert_eq!(second.rows_closed(), 0);
        assert_eq!(second.post_mortems_created, 0);
        assert_eq!(second.post_mortems_backfilled, 0);
        assert_eq!(store.trades_for(id), trades_after_first);
        assert_eq!(store.post_mortems_for(id).len(), 1);
    }

    #[tokio::test]
    async fn test_live_hypotheses_are_not_orphans() {
        let store = Arc::new(MemoryStore::new());
        let live = store.insert_hypothesis(Hypothesis::new(
            "HYP-LIVE",
            HypothesisStatus::Active,
            hours_before(clock(), 10),
            None,
        ));
        seed_dependents(&store, live);

        let summary = cleaner(&store).run_at(clock()).await.unwrap();

        assert_eq!(summary.orphans_found, 0);
        assert_eq!(store.trades_for(live)[0].status, TradeStatus::Open.as_str());
    }

    #[tokio::test]
    async fn test_only_open_trades_expire() {
        let store = Arc::new(MemoryStore::new());
        let id = falsified_hypothesis(&store, "HYP-DEAD").await;
        store.insert_trade(ShadowTradeRecord::closed(id, PnlType::Realized, dec!(-0.01), hours_before(clock(), 30)));
        store.insert_trade(ShadowTradeRecord::open(id, PnlType::Counterfactual, hours_before(clock(), 3)));

        let summary = cleaner(&store).run_at(clock()).await.unwrap();

        assert_eq!(summary.trades_expired, 1);
        let statuses: Vec<String> = store.trades_for(id).into_iter().map(|t| t.status).collect();
        assert_eq!(statuses, vec!["CLOSED".to_string(), "EXPIRED".to_string()]);
    }

    // =========================================================================
    // Isolation
    // =========================================================================

    #[tokio::test]
    async fn test_failure_is_isolated_per_hypothesis() {
        let store = Arc::new(MemoryStore::new());
        let broken = falsified_hypothesis(&store, "HYP-BROKEN").await;
        let healthy = falsified_hypothesis(&store, "HYP-HEALTHY").await;
        seed_dependents(&store, broken);
        seed_dependents(&store, healthy);
        store.fail_cascade_for(broken);

        let summary = cleaner(&store).run_at(clock()).await.unwrap();

        assert_eq!(summary.orphans_found, 2);
        assert_eq!(summary.cleaned, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].canon_id, broken);
        assert!(summary.had_failures());
        assert_eq!(store.trades_for(broken)[0].status, TradeStatus::Open.as_str());
        assert_eq!(store.trades_for(healthy)[0].status, TradeStatus::Expired.as_str());

        let retry = cleaner(&store).run_at(clock()).await.unwrap();
        assert_eq!(retry.orphans_found, 1);
        assert_eq!(retry.failures[0].canon_id, broken);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_cycle() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);

        assert!(cleaner(&store).run_at(clock()).await.is_err());
    }

    // =========================================================================
    // Post-mortem backfill
    // =========================================================================

    #[tokio::test]
    async fn test_backfill_for_falsified_without_dependents() {
        let store = Arc::new(MemoryStore::new());
        let id = falsified_hypothesis(&store, "HYP-QUIET").await;
        let unknown = store.insert_hypothesis(Hypothesis::new(
            "HYP-LEGACY",
            HypothesisStatus::Falsified,
            hours_before(clock(), 500),
            None,
        ));

        let summary = cleaner(&store).run_at(clock()).await.unwrap();

        assert_eq!(summary.orphans_found, 0);
        assert_eq!(summary.post_mortems_backfilled, 2);
        assert_eq!(store.post_mortems_for(id)[0].fail_reason_code, "TRADE_SHARPE_BELOW_THRESHOLD");
        assert_eq!(store.post_mortems_for(unknown)[0].fail_reason_code, "UNKNOWN");

        let again = cleaner(&store).run_at(clock()).await.unwrap();
        assert_eq!(again.post_mortems_backfilled, 0);
        assert_eq!(store.post_mortems_for(id).len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_writes_evidence_file() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let id = falsified_hypothesis(&store, "HYP-DEAD").await;
        seed_dependents(&store, id);
        let cleaner = OrphanCascadeCleaner::new(
            store.clone(),
            &OrphanCleanupConfig::default(),
            EvidenceWriter::new(Some(dir.path().to_path_buf()), true),
        );

        cleaner.run_at(clock()).await.unwrap();

        let evidence = store.evidence();
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].summary["orphans_found"], 1);
        assert_eq!(evidence[0].summary["trades_expired"], 1);
        assert_eq!(evidence[0].summary["simulations_stopped"], 1);
        assert_eq!(evidence[0].summary["experiments_completed"], 1);
        assert!(EvidenceWriter::file_path(dir.path(), &evidence[0]).exists());
    }
}
