//! # Darwinian
//!
//! Entropy-driven search controller for Entroswarm.
//!
//! ## Round
//!
//! ```text
//! GENERATE → EXECUTE → PERSIST → SCORE → SELECT → FINALIZE → PROPAGATE → ADVANCE
//!                                            └──→ RETRY (grow budgets) ──→ GENERATE
//! ```
//!
//! ## Fitness
//!
//! Multiscale entropy of a persisted snapshot of `N` bytes:
//!
//! ```text
//! score = (Σ_{k=1..N} H_k) / N
//! ```
//!
//! Where `H_k` is the Shannon entropy, in bits, of the non-overlapping
//! `k`-byte chunks.
//!
//! ## Budgets
//!
//! A new record resets every step budget to its base. Otherwise budgets double
//! under `max`/`min` and grow by the increment under `delta`, or when the idle
//! control agent won.

pub mod agent;
pub mod controller;
pub mod environment;
pub mod fitness;
pub mod selection;
pub mod strategy;
pub mod telemetry;

pub use agent::{Agent, AgentSpec};
pub use controller::{
    AgentDescriptor, AttemptOutcome, AttemptReport, CancellationFlag, RoundOutcome, RoundPhase,
    SwarmController,
};
pub use environment::{Environment, SimulatedEnvironment};
pub use fitness::EntropyEstimator;

use entroswarm_common::{
    ConfigurationError, ExplorationMode, FitnessMode, GridLayout, BASE_STEPS, INCREMENT_STEPS,
};

/// Swarm configuration
#[derive(Debug, Clone)]
pub struct SwarmConfig {
    /// Population grid
    pub layout: GridLayout,
    /// Make the last grid cell the idle control agent
    pub include_idle_agent: bool,
    pub exploration_mode: ExplorationMode,
    pub fitness_mode: FitnessMode,
    /// Budget every acting agent starts with and returns to on a new record
    pub base_step_budget: usize,
    /// Growth per stagnant attempt under delta mode
    pub step_increment: usize,
    /// Largest chunk size scanned by the entropy estimator
    pub max_chunk_size: Option<usize>,
    pub settle_delay_ms: u64,
    pub spawn_timeout_ms: u64,
    /// Fixed seed for key assignment and action draws
    pub seed: Option<u64>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            layout: GridLayout::default(),
            include_idle_agent: true,
            exploration_mode: ExplorationMode::AllRandom,
            fitness_mode: FitnessMode::Max,
            base_step_budget: BASE_STEPS,
            step_increment: INCREMENT_STEPS,
            max_chunk_size: None,
            settle_delay_ms: 5_000,
            spawn_timeout_ms: 10_000,
            seed: None,
        }
    }
}

impl SwarmConfig {
    /// Agents that receive key bindings
    pub fn assignable_agents(&self) -> usize {
        let total = self.layout.size();
        if self.include_idle_agent {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.layout.size() == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "population grid is empty".into(),
            ));
        }
        if self.assignable_agents() == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "population has no acting agent".into(),
            ));
        }
        if self.base_step_budget == 0 {
            return Err(ConfigurationError::InvalidParameter(
                "base step budget must be positive".into(),
            ));
        }
        Ok(())
    }
}
