//! Falsification evaluator.
//!
//! Decides, for one hypothesis, whether its closed realized trades falsify it.
//! Pure query + compute: nothing here writes.
//!
//! Only trades with `status = CLOSED` and `pnl_type = REALIZED` are evidence.
//! That filter lives in the store query, not in a tunable, so counterfactual
//! performance can never reach [`judge`].

use anyhow::Result;
use fhq_core::governance::{self, GovernanceConstants, ZERO_VARIANCE_EPSILON};
use fhq_core::{ClosedTrade, OutcomeStore};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of evaluating one hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Evidence says the hypothesis is dead.
    Falsified,
    /// Evidence is sufficient and the hypothesis survives.
    Passing,
    /// Not enough usable evidence yet; retried next cycle.
    InsufficientData,
}

/// Summary statistics over the closed realized returns of one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    /// Closed realized trades with a recorded return.
    pub closed_trades: usize,
    /// Closed realized trades the recorder closed without a return.
    pub null_returns: usize,
    pub mean_return: Option<f64>,
    /// Sample standard deviation (n - 1).
    pub std_return: Option<f64>,
    pub wins: usize,
    pub losses: usize,
    /// mean / std, with the zero-variance epsilon substituted; `None` below two observations.
    pub sharpe: Option<f64>,
}

impl TradeStats {
    /// Computes statistics from closed realized trades.
    #[must_use]
    pub fn from_trades(trades: &[ClosedTrade]) -> Self {
        let returns: Vec<f64> = trades
            .iter()
            .filter_map(|t| t.shadow_return_pct.and_then(|r| r.to_f64()))
            .collect();
        let null_returns = trades.len() - returns.len();
        Self::from_returns(&returns, null_returns)
    }

    #[must_use]
    pub fn from_returns(returns: &[f64], null_returns: usize) -> Self {
        let n = returns.len();
        let wins = returns.iter().filter(|&&r| r > 0.0).count();
        let losses = returns.iter().filter(|&&r| r < 0.0).count();

        let mean_return = (n > 0).then(|| returns.iter().sum::<f64>() / n as f64);

        let std_return = match mean_return {
            Some(mean) if n >= 2 => {
                let variance =
                    returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                Some(variance.sqrt())
            }
            _ => None,
        };

        let sharpe = match (mean_return, std_return) {
            (Some(mean), Some(std)) => {
                let denominator = if std < f64::EPSILON {
                    ZERO_VARIANCE_EPSILON
                } else {
                    std
                };
                Some(mean / denominator)
            }
            _ => None,
        };

        Self {
            closed_trades: n,
            null_returns,
            mean_return,
            std_return,
            wins,
            losses,
            sharpe,
        }
    }
}

/// Applies the frozen decision rule.
#[must_use]
pub fn judge(stats: &TradeStats, constants: &GovernanceConstants) -> Verdict {
    if stats.closed_trades < constants.min_trades_for_eval {
        return Verdict::InsufficientData;
    }
    match stats.sharpe {
        None => Verdict::InsufficientData,
        Some(sharpe) if sharpe < constants.sharpe_threshold => Verdict::Falsified,
        Some(_) => Verdict::Passing,
    }
}

/// Verdict plus the statistics that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub canon_id: Uuid,
    pub verdict: Verdict,
    pub stats: TradeStats,
    pub governance_version: u32,
}

/// Evaluates hypotheses against their closed realized trades.
pub struct FalsificationEvaluator<S: OutcomeStore> {
    store: Arc<S>,
    constants: GovernanceConstants,
}

impl<S: OutcomeStore> FalsificationEvaluator<S> {
    /// Creates an evaluator bound to the active governance version.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            constants: governance::active(),
        }
    }

    /// Creates an evaluator pinned to a historical governance version, for
    /// replaying past decisions. Returns `None` for unknown versions.
    #[must_use]
    pub fn pinned(store: Arc<S>, version: u32) -> Option<Self> {
        governance::version(version).map(|constants| Self { store, constants })
    }

    #[must_use]
    pub fn constants(&self) -> &GovernanceConstants {
        &self.constants
    }

    /// Evaluates one hypothesis.
    ///
    /// # Errors
    /// Returns an error if the trade query fails.
    pub async fn evaluate(&self, canon_id: Uuid) -> Result<Evaluation> {
        let trades = self.store.closed_realized_trades(canon_id).await?;
        let stats = TradeStats::from_trades(&trades);
        let verdict = judge(&stats, &self.constants);

        Ok(Evaluation {
            canon_id,
            verdict,
            stats,
            governance_version: self.constants.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fhq_core::governance::{MIN_TRADES_FOR_EVAL, SHARPE_THRESHOLD};
    use fhq_core::PnlType;
    use fhq_data::{MemoryStore, ShadowTradeRecord};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn scenario_returns() -> Vec<f64> {
        let mut returns = vec![-0.01; 25];
        returns.extend(vec![0.005; 5]);
        returns
    }

    fn seed(store: &MemoryStore, canon_id: Uuid, pnl_type: PnlType, returns: &[Decimal]) {
        for r in returns {
            store.insert_trade(ShadowTradeRecord::closed(canon_id, pnl_type, *r, Utc::now()));
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    #[test]
    fn test_stats_scenario() {
        let stats = TradeStats::from_returns(&scenario_returns(), 0);

        assert_eq!(stats.closed_trades, 30);
        assert_eq!(stats.wins, 5);
        assert_eq!(stats.losses, 25);
        assert!((stats.mean_return.unwrap() - (-0.0075)).abs() < 1e-12);
        let sharpe = stats.sharpe.unwrap();
        assert!(sharpe < -1.0 && sharpe > -1.5, "sharpe = {sharpe}");
    }

    #[test]
    fn test_zero_variance_uses_epsilon() {
        let stats = TradeStats::from_returns(&[-0.25; 40], 0);

        assert_eq!(stats.std_return, Some(0.0));
        assert!((stats.sharpe.unwrap() - (-0.25 / ZERO_VARIANCE_EPSILON)).abs() < 1e-9);
    }

    #[test]
    fn test_single_observation_has_no_sharpe() {
        let stats = TradeStats::from_returns(&[0.01], 0);
        assert!(stats.sharpe.is_none());
        assert!(stats.std_return.is_none());
    }

    #[test]
    fn test_empty_returns() {
        let stats = TradeStats::from_returns(&[], 3);
        assert_eq!(stats.closed_trades, 0);
        assert_eq!(stats.null_returns, 3);
        assert!(stats.mean_return.is_none());
    }

    // =========================================================================
    // Decision rule
    // =========================================================================

    #[test]
    fn test_scenario_is_falsified() {
        let stats = TradeStats::from_returns(&scenario_returns(), 0);
        assert_eq!(MIN_TRADES_FOR_EVAL, 30);
        assert!((SHARPE_THRESHOLD - 0.0).abs() < f64::EPSILON);
        assert_eq!(judge(&stats, &governance::active()), Verdict::Falsified);
    }

    #[test]
    fn test_minimum_sample_gate_ignores_magnitude() {
        let returns = vec![-0.5; MIN_TRADES_FOR_EVAL - 1];
        let stats = TradeStats::from_returns(&returns, 0);
        assert_eq!(judge(&stats, &governance::active()), Verdict::InsufficientData);
    }

    #[test]
    fn test_positive_performance_passes() {
        let mut returns = vec![0.01; 20];
        returns.extend(vec![-0.005; 15]);
        let stats = TradeStats::from_returns(&returns, 0);
        assert_eq!(judge(&stats, &governance::active()), Verdict::Passing);
    }

    #[test]
    fn test_threshold_is_strict() {
        // Mean exactly zero: Sharpe 0.0 is not below a 0.0 threshold.
        let mut returns = vec![0.25; 20];
        returns.extend(vec![-0.25; 20]);
        let stats = TradeStats::from_returns(&returns, 0);
        assert_eq!(judge(&stats, &governance::active()), Verdict::Passing);
    }

    #[test]
    fn test_historical_version_has_smaller_gate() {
        let v1 = governance::version(1).unwrap();
        let stats = TradeStats::from_returns(&[-0.01, -0.02, -0.01, 0.001, -0.03], 0);
        assert_eq!(judge(&stats, &v1), Verdict::Falsified);
        assert_eq!(judge(&stats, &governance::active()), Verdict::InsufficientData);
    }

    // =========================================================================
    // Store-backed evaluation
    // =========================================================================

    #[tokio::test]
    async fn test_counterfactual_trades_never_count() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        seed(&store, id, PnlType::Counterfactual, &vec![dec!(-0.05); 500]);

        let evaluation = FalsificationEvaluator::new(store).evaluate(id).await.unwrap();

        assert_eq!(evaluation.verdict, Verdict::InsufficientData);
        assert_eq!(evaluation.stats.closed_trades, 0);
    }

    #[tokio::test]
    async fn test_open_trades_never_count() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        for _ in 0..40 {
            store.insert_trade(ShadowTradeRecord::open(id, PnlType::Realized, Utc::now()));
        }

        let evaluation = FalsificationEvaluator::new(store).evaluate(id).await.unwrap();
        assert_eq!(evaluation.verdict, Verdict::InsufficientData);
    }

    #[tokio::test]
    async fn test_null_returns_do_not_fill_sample() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        seed(&store, id, PnlType::Realized, &vec![dec!(-0.01); MIN_TRADES_FOR_EVAL - 1]);
        let mut broken = ShadowTradeRecord::closed(id, PnlType::Realized, dec!(0), Utc::now());
        broken.shadow_return_pct = None;
        store.insert_trade(broken);

        let evaluation = FalsificationEvaluator::new(store).evaluate(id).await.unwrap();

        assert_eq!(evaluation.stats.null_returns, 1);
        assert_eq!(evaluation.verdict, Verdict::InsufficientData);
    }

    #[tokio::test]
    async fn test_store_scenario_falsified() {
        let store = Arc::new(MemoryStore::new());
        let id = Uuid::new_v4();
        seed(&store, id, PnlType::Realized, &vec![dec!(-0.01); 25]);
        seed(&store, id, PnlType::Realized, &vec![dec!(0.005); 5]);

        let evaluation = FalsificationEvaluator::new(store).evaluate(id).await.unwrap();

        assert_eq!(evaluation.verdict, Verdict::Falsified);
        assert_eq!(evaluation.governance_version, governance::ACTIVE_GOVERNANCE_VERSION);
    }

    #[test]
    fn test_pinned_unknown_version() {
        let store = Arc::new(MemoryStore::new());
        assert!(FalsificationEvaluator::pinned(store, 42).is_none());
    }
}
