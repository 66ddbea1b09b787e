//! In-memory lifecycle store.
//!
//! Mirrors the predicate semantics of [`crate::PgLifecycleStore`] row for row:
//! every write re-checks the current state and reports how many rows it
//! changed. Used by the daemon tests, with hooks to inject storage failures.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fhq_core::cascade::{CASCADE_SIMULATION_STOP_REASON, CASCADE_TRADE_EXIT_REASON};
use fhq_core::{
    AnnihilationReason, CapitalSimulationStatus, CascadeCounts, CascadeStore, ClosedTrade,
    CycleEvidence, EvidenceStore, ExperimentStatus, Hypothesis, HypothesisStatus, HypothesisStore,
    OrphanedHypothesis, OutcomeStore, PostMortemDraft, TradeStatus, TransitionRequest,
};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::models::{
    CapitalSimulationRecord, ExperimentRecord, PostMortemRecord, ShadowTradeRecord,
};
use crate::pg_store::cascade_detail;

#[derive(Debug, Default)]
struct MemoryState {
    hypotheses: Vec<Hypothesis>,
    trades: Vec<ShadowTradeRecord>,
    simulations: Vec<CapitalSimulationRecord>,
    experiments: Vec<ExperimentRecord>,
    post_mortems: Vec<PostMortemRecord>,
    evidence: Vec<CycleEvidence>,
    failing_cascades: HashSet<Uuid>,
    unavailable: bool,
    outcome_queries: usize,
}

/// Lifecycle store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn available(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let state = self.state();
        if state.unavailable {
            bail!("connection refused: store unavailable");
        }
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Seeding
    // ------------------------------------------------------------------

    pub fn insert_hypothesis(&self, hypothesis: Hypothesis) -> Uuid {
        let id = hypothesis.canon_id;
        self.state().hypotheses.push(hypothesis);
        id
    }

    pub fn insert_trade(&self, trade: ShadowTradeRecord) -> Uuid {
        let id = trade.trade_id;
        self.state().trades.push(trade);
        id
    }

    pub fn insert_simulation(&self, simulation: CapitalSimulationRecord) -> Uuid {
        let id = simulation.simulation_id;
        self.state().simulations.push(simulation);
        id
    }

    pub fn insert_experiment(&self, experiment: ExperimentRecord) -> Uuid {
        let id = experiment.experiment_id;
        self.state().experiments.push(experiment);
        id
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Makes every cascade of `canon_id` fail before touching any row.
    pub fn fail_cascade_for(&self, canon_id: Uuid) {
        self.state().failing_cascades.insert(canon_id);
    }

    /// Makes every store call fail, as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    #[must_use]
    pub fn hypothesis(&self, canon_id: Uuid) -> Option<Hypothesis> {
        self.state().hypotheses.iter().find(|h| h.canon_id == canon_id).cloned()
    }

    #[must_use]
    pub fn trades_for(&self, canon_id: Uuid) -> Vec<ShadowTradeRecord> {
        self.state()
            .trades
            .iter()
            .filter(|t| t.source_hypothesis_id == canon_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn simulations_for(&self, canon_id: Uuid) -> Vec<CapitalSimulationRecord> {
        self.state()
            .simulations
            .iter()
            .filter(|s| s.source_hypothesis_id == canon_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn experiments_for(&self, canon_id: Uuid) -> Vec<ExperimentRecord> {
        self.state()
            .experiments
            .iter()
            .filter(|e| e.source_hypothesis_id == canon_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn post_mortems_for(&self, canon_id: Uuid) -> Vec<PostMortemRecord> {
        self.state()
            .post_mortems
            .iter()
            .filter(|p| p.canon_id == canon_id)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn evidence(&self) -> Vec<CycleEvidence> {
        self.state().evidence.clone()
    }

    /// Number of per-hypothesis outcome queries served so far.
    #[must_use]
    pub fn outcome_queries(&self) -> usize {
        self.state().outcome_queries
    }
}

fn orphan_of(state: &MemoryState, h: &Hypothesis) -> OrphanedHypothesis {
    let open = TradeStatus::Open.as_str();
    let sim_open = CapitalSimulationStatus::Open.as_str();
    let running = ExperimentStatus::Running.as_str();
    let count = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);

    OrphanedHypothesis {
        canon_id: h.canon_id,
        hypothesis_code: h.hypothesis_code.clone(),
        annihilation_reason: h.annihilation_reason.clone(),
        open_trades: count(
            state
                .trades
                .iter()
                .filter(|t| t.source_hypothesis_id == h.canon_id && t.status == open)
                .count(),
        ),
        open_simulations: count(
            state
                .simulations
                .iter()
                .filter(|s| s.source_hypothesis_id == h.canon_id && s.status == sim_open)
                .count(),
        ),
        running_experiments: count(
            state
                .experiments
                .iter()
                .filter(|e| e.source_hypothesis_id == h.canon_id && e.status == running)
                .count(),
        ),
    }
}

fn insert_post_mortem_locked(
    state: &mut MemoryState,
    draft: &PostMortemDraft,
    now: DateTime<Utc>,
) -> bool {
    if state.post_mortems.iter().any(|p| p.canon_id == draft.canon_id) {
        return false;
    }
    state.post_mortems.push(PostMortemRecord::from_draft(draft, now));
    true
}

fn limit_of(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

#[async_trait]
impl HypothesisStore for MemoryStore {
    async fn get_hypothesis(&self, canon_id: Uuid) -> Result<Option<Hypothesis>> {
        let state = self.available()?;
        Ok(state.hypotheses.iter().find(|h| h.canon_id == canon_id).cloned())
    }

    async fn falsification_candidates(
        &self,
        states: &[HypothesisStatus],
        limit: u32,
    ) -> Result<Vec<Hypothesis>> {
        let state = self.available()?;
        let mut candidates: Vec<Hypothesis> = state
            .hypotheses
            .iter()
            .filter(|h| states.contains(&h.status))
            .filter(|h| {
                state
                    .trades
                    .iter()
                    .any(|t| t.source_hypothesis_id == h.canon_id && t.is_closed_realized())
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|h| (h.last_evaluated_at, h.created_at));
        candidates.truncate(limit_of(limit));
        Ok(candidates)
    }

    async fn expired_hypotheses(
        &self,
        states: &[HypothesisStatus],
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Hypothesis>> {
        let state = self.available()?;
        let mut expired: Vec<Hypothesis> = state
            .hypotheses
            .iter()
            .filter(|h| states.contains(&h.status) && h.is_past_horizon(now))
            .cloned()
            .collect();
        expired.sort_by_key(|h| h.created_at);
        expired.truncate(limit_of(limit));
        Ok(expired)
    }

    async fn falsify(&self, request: &TransitionRequest) -> Result<u64> {
        let mut state = self.available()?;
        let Some(h) = state
            .hypotheses
            .iter_mut()
            .find(|h| h.canon_id == request.canon_id && request.allowed_from.contains(&h.status))
        else {
            return Ok(0);
        };

        h.status = HypothesisStatus::Falsified;
        h.falsified_at = Some(request.evaluated_at);
        h.death_timestamp = Some(request.evaluated_at);
        h.annihilation_reason = Some(request.reason.to_string());
        Ok(1)
    }

    async fn mark_evaluated(&self, canon_id: Uuid, evaluated_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.available()?;
        if let Some(h) = state.hypotheses.iter_mut().find(|h| h.canon_id == canon_id) {
            h.last_evaluated_at = Some(evaluated_at);
        }
        Ok(())
    }
}

#[async_trait]
impl OutcomeStore for MemoryStore {
    async fn closed_realized_trades(&self, canon_id: Uuid) -> Result<Vec<ClosedTrade>> {
        let mut state = self.available()?;
        state.outcome_queries += 1;
        Ok(state
            .trades
            .iter()
            .filter(|t| t.source_hypothesis_id == canon_id && t.is_closed_realized())
            .map(ClosedTrade::from)
            .collect())
    }

    async fn count_realized_exits_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let state = self.available()?;
        let n = state
            .trades
            .iter()
            .filter(|t| t.is_closed_realized() && t.exit_time.is_some_and(|x| x >= since))
            .count();
        Ok(i64::try_from(n)?)
    }
}

#[async_trait]
impl CascadeStore for MemoryStore {
    async fn find_orphaned(&self, limit: u32) -> Result<Vec<OrphanedHypothesis>> {
        let state = self.available()?;
        let mut falsified: Vec<&Hypothesis> = state
            .hypotheses
            .iter()
            .filter(|h| h.status == HypothesisStatus::Falsified)
            .collect();
        falsified.sort_by_key(|h| h.falsified_at);

        Ok(falsified
            .into_iter()
            .map(|h| orphan_of(&state, h))
            .filter(|o| o.open_trades > 0 || o.open_simulations > 0 || o.running_experiments > 0)
            .take(limit_of(limit))
            .collect())
    }

    async fn cascade_close(
        &self,
        orphan: &OrphanedHypothesis,
        now: DateTime<Utc>,
    ) -> Result<CascadeCounts> {
        let mut state = self.available()?;
        if state.failing_cascades.contains(&orphan.canon_id) {
            bail!("cascade for {} rolled back: injected failure", orphan.canon_id);
        }

        let mut counts = CascadeCounts::default();
        for t in state
            .trades
            .iter_mut()
            .filter(|t| t.source_hypothesis_id == orphan.canon_id && t.status == TradeStatus::Open.as_str())
        {
            t.status = TradeStatus::Expired.as_str().to_string();
            t.exit_reason = Some(CASCADE_TRADE_EXIT_REASON.to_string());
            t.exit_time = Some(now);
            counts.trades_expired += 1;
        }
        for s in state.simulations.iter_mut().filter(|s| {
            s.source_hypothesis_id == orphan.canon_id
                && s.status == CapitalSimulationStatus::Open.as_str()
        }) {
            s.status = CapitalSimulationStatus::Stopped.as_str().to_string();
            s.stop_reason = Some(CASCADE_SIMULATION_STOP_REASON.to_string());
            s.stopped_at = Some(now);
            counts.simulations_stopped += 1;
        }
        for e in state.experiments.iter_mut().filter(|e| {
            e.source_hypothesis_id == orphan.canon_id
                && e.status == ExperimentStatus::Running.as_str()
        }) {
            e.status = ExperimentStatus::Completed.as_str().to_string();
            e.result = Some(HypothesisStatus::Falsified.as_str().to_string());
            e.completed_at = Some(now);
            counts.experiments_completed += 1;
        }

        let draft = PostMortemDraft {
            canon_id: orphan.canon_id,
            fail_reason_code: AnnihilationReason::code_of(orphan.annihilation_reason.as_deref())
                .to_string(),
            detail: cascade_detail(orphan, &counts),
        };
        counts.post_mortem_created = insert_post_mortem_locked(&mut state, &draft, now);
        Ok(counts)
    }

    async fn falsified_without_post_mortem(&self, limit: u32) -> Result<Vec<Hypothesis>> {
        let state = self.available()?;
        let mut missing: Vec<Hypothesis> = state
            .hypotheses
            .iter()
            .filter(|h| h.status == HypothesisStatus::Falsified)
            .filter(|h| !state.post_mortems.iter().any(|p| p.canon_id == h.canon_id))
            .cloned()
            .collect();
        missing.sort_by_key(|h| h.falsified_at);
        missing.truncate(limit_of(limit));
        Ok(missing)
    }

    async fn insert_post_mortem(&self, draft: &PostMortemDraft, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.available()?;
        Ok(insert_post_mortem_locked(&mut state, draft, now))
    }
}

#[async_trait]
impl EvidenceStore for MemoryStore {
    async fn record_evidence(&self, evidence: &CycleEvidence) -> Result<()> {
        let mut state = self.available()?;
        state.evidence.push(evidence.clone());
        Ok(())
    }
}

/// Returns `now - hours`, for seeding trades relative to a fixed clock.
#[must_use]
pub fn hours_before(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    now - Duration::hours(hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fhq_core::{PnlType, ReasonCode};
    use rust_decimal_macros::dec;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn request(canon_id: Uuid, allowed: &[HypothesisStatus]) -> TransitionRequest {
        TransitionRequest {
            canon_id,
            reason: AnnihilationReason::new(ReasonCode::DataError, "test"),
            evaluated_at: clock(),
            allowed_from: allowed.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_falsify_is_predicate_guarded() {
        let store = MemoryStore::new();
        let id = store.insert_hypothesis(Hypothesis::new(
            "HYP-1",
            HypothesisStatus::Active,
            hours_before(clock(), 10),
            None,
        ));

        let first = store.falsify(&request(id, HypothesisStatus::PRE_TERMINAL)).await.unwrap();
        let second = store.falsify(&request(id, HypothesisStatus::PRE_TERMINAL)).await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(store.hypothesis(id).unwrap().status, HypothesisStatus::Falsified);
    }

    #[tokio::test]
    async fn test_closed_realized_filter() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let now = clock();
        store.insert_trade(ShadowTradeRecord::closed(id, PnlType::Realized, dec!(0.01), now));
        store.insert_trade(ShadowTradeRecord::closed(id, PnlType::Counterfactual, dec!(0.02), now));
        store.insert_trade(ShadowTradeRecord::open(id, PnlType::Realized, now));

        let trades = store.closed_realized_trades(id).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].shadow_return_pct, Some(dec!(0.01)));
    }

    #[tokio::test]
    async fn test_candidates_rotate_on_last_evaluation() {
        let store = MemoryStore::new();
        let old = store.insert_hypothesis(Hypothesis::new(
            "HYP-OLD",
            HypothesisStatus::Active,
            hours_before(clock(), 300),
            None,
        ));
        let new = store.insert_hypothesis(Hypothesis::new(
            "HYP-NEW",
            HypothesisStatus::Active,
            hours_before(clock(), 10),
            None,
        ));
        for id in [old, new] {
            store.insert_trade(ShadowTradeRecord::closed(id, PnlType::Realized, dec!(0.01), clock()));
        }

        let first = store.falsification_candidates(HypothesisStatus::PRE_TERMINAL, 1).await.unwrap();
        assert_eq!(first[0].canon_id, old);

        store.mark_evaluated(old, clock()).await.unwrap();
        let second = store.falsification_candidates(HypothesisStatus::PRE_TERMINAL, 1).await.unwrap();
        assert_eq!(second[0].canon_id, new);
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.count_realized_exits_since(clock()).await.is_err());
    }

    #[tokio::test]
    async fn test_post_mortem_inserted_once() {
        let store = MemoryStore::new();
        let draft = PostMortemDraft {
            canon_id: Uuid::new_v4(),
            fail_reason_code: "TIMEOUT".to_string(),
            detail: "horizon".to_string(),
        };

        assert!(store.insert_post_mortem(&draft, clock()).await.unwrap());
        assert!(!store.insert_post_mortem(&draft, clock()).await.unwrap());
        assert_eq!(store.post_mortems_for(draft.canon_id).len(), 1);
    }
}
