//! Database repositories for the lifecycle tables.
//!
//! Each repository provides typed access to one table. Methods that take a
//! `&mut PgConnection` are meant to run inside a caller-owned transaction.

pub mod capital_simulation_repo;
pub mod evidence_repo;
pub mod experiment_repo;
pub mod hypothesis_repo;
pub mod post_mortem_repo;
pub mod shadow_trade_repo;

pub use capital_simulation_repo::CapitalSimulationRepository;
pub use evidence_repo::EvidenceRepository;
pub use experiment_repo::ExperimentRepository;
pub use hypothesis_repo::HypothesisRepository;
pub use post_mortem_repo::PostMortemRepository;
pub use shadow_trade_repo::ShadowTradeRepository;

use sqlx::PgPool;

/// Creates all repositories from a single database pool.
#[derive(Debug, Clone)]
pub struct Repositories {
    pub hypotheses: HypothesisRepository,
    pub shadow_trades: ShadowTradeRepository,
    pub capital_simulations: CapitalSimulationRepository,
    pub experiments: ExperimentRepository,
    pub post_mortems: PostMortemRepository,
    pub evidence: EvidenceRepository,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            hypotheses: HypothesisRepository::new(pool.clone()),
            shadow_trades: ShadowTradeRepository::new(pool.clone()),
            capital_simulations: CapitalSimulationRepository::new(pool.clone()),
            experiments: ExperimentRepository::new(pool.clone()),
            post_mortems: PostMortemRepository::new(pool.clone()),
            evidence: EvidenceRepository::new(pool),
        }
    }
}
