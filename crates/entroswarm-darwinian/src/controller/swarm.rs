//! Swarm controller: the lockstep generate / execute / persist / score /
//! select loop, with propagation of the winning snapshot and adaptive step
//! budgets.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use entroswarm_common::{
    ActionMode, ExplorationMode, FitnessMode, PhysicalKey, Placement, Result, SwarmError,
};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};

use super::CancellationFlag;
use crate::agent::{Agent, AgentSpec};
use crate::environment::Environment;
use crate::fitness::EntropyEstimator;
use crate::selection::{BudgetGrowth, SelectionPolicy};
use crate::strategy::KeyBindingAssigner;
use crate::telemetry::SwarmMetrics;
use crate::SwarmConfig;

/// Where the controller is inside a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    Generate,
    Execute,
    Persist,
    Score,
    Select,
    Finalize,
    Retry,
    Propagate,
    Advance,
}

/// What an environment factory is told about the agent it builds for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    pub index: usize,
    pub name: String,
    pub placement: Placement,
    pub is_idle: bool,
}

/// Summary of one attempt at a round
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    pub winner: usize,
    pub winner_name: String,
    pub winner_idle: bool,
    /// Winner's comparison value
    pub value: f64,
    /// Best record after the attempt
    pub record: f64,
    /// Longest action sequence in the population
    pub steps: usize,
    pub actions_dispatched: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// New record: budgets reset, winner propagated, generation advanced
    Improved(AttemptReport),
    /// No record: budgets grown, nothing else changed
    Stagnated(AttemptReport),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    Finalized { attempts: u64, report: AttemptReport },
    /// The flag was raised before an improving attempt
    Cancelled { attempts: u64 },
}

/// Owns the population and the best record
pub struct SwarmController {
    config: SwarmConfig,
    agents: Vec<Agent>,
    policy: SelectionPolicy,
    estimator: EntropyEstimator,
    best_record_ever: f64,
    rng: StdRng,
    phase: RoundPhase,
    rounds_finalized: u64,
    metrics: Arc<SwarmMetrics>,
}

impl SwarmController {
    /// Build the grid population, assigning bindings once by flat index over
    /// the non-idle agents. `factory` supplies each agent's environment.
    pub fn new<F>(config: SwarmConfig, key_pool: Vec<PhysicalKey>, mut factory: F) -> Result<Self>
    where
        F: FnMut(&AgentDescriptor) -> Result<Box<dyn Environment>>,
    {
        config.validate()?;

        let mut rng = seeded_rng(config.seed);
        let total = config.layout.size();
        let assignable = config.assignable_agents();

        let assigner = KeyBindingAssigner::new(config.exploration_mode, key_pool)?;
        let mut binding_lists = assigner.assign(assignable, &mut rng)?.into_iter();

        let mut agents = Vec::with_capacity(total);
        for (index, (column, row)) in config.layout.cells().enumerate() {
            let placement = config.layout.placement(column, row);
            let is_idle = config.include_idle_agent && index + 1 == total;

            let spec = if is_idle {
                AgentSpec::idle(format!("idle-{column}-{row}"), placement)
            } else {
                let bindings = binding_lists.next().ok_or_else(|| {
                    SwarmError::Internal(format!("no binding list for agent {index}"))
                })?;
                AgentSpec {
                    name: format!("agent-{column}-{row}"),
                    bindings,
                    action_mode: ActionMode::AllRandom,
                    placement,
                    base_step_budget: config.base_step_budget,
                    step_increment: config.step_increment,
                }
            };

            let descriptor = AgentDescriptor {
                index,
                name: spec.name.clone(),
                placement,
                is_idle,
            };
            let environment = factory(&descriptor)?;
            agents.push(Agent::new(index, spec, environment));
        }

        info!(
            agents = agents.len(),
            columns = config.layout.columns,
            rows = config.layout.rows,
            exploration = %config.exploration_mode,
            fitness = %config.fitness_mode,
            idle = config.include_idle_agent,
            "Population built"
        );

        Self::assemble(config, agents, rng)
    }

    /// Controller over agents built by the caller
    pub fn with_population(config: SwarmConfig, agents: Vec<Agent>) -> Result<Self> {
        if agents.is_empty() {
            return Err(entroswarm_common::ConfigurationError::InvalidParameter(
                "population is empty".into(),
            )
            .into());
        }
        let rng = seeded_rng(config.seed);
        Self::assemble(config, agents, rng)
    }

    fn assemble(config: SwarmConfig, agents: Vec<Agent>, rng: StdRng) -> Result<Self> {
        let metrics = SwarmMetrics::new().map_err(|e| SwarmError::Internal(e.to_string()))?;
        let estimator = match config.max_chunk_size {
            Some(cap) => EntropyEstimator::with_max_chunk_size(cap),
            None => EntropyEstimator::new(),
        };
        Ok(Self {
            policy: SelectionPolicy::new(config.fitness_mode),
            best_record_ever: config.fitness_mode.initial_record(),
            estimator,
            config,
            agents,
            rng,
            phase: RoundPhase::Idle,
            rounds_finalized: 0,
            metrics: Arc::new(metrics),
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn config(&self) -> &SwarmConfig {
        &self.config
    }

    pub fn best_record_ever(&self) -> f64 {
        self.best_record_ever
    }

    pub fn exploration_mode(&self) -> ExplorationMode {
        self.config.exploration_mode
    }

    pub fn fitness_mode(&self) -> FitnessMode {
        self.policy.mode()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn rounds_finalized(&self) -> u64 {
        self.rounds_finalized
    }

    pub fn metrics(&self) -> Arc<SwarmMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Spawn every environment concurrently, wait the settle delay, configure
    /// each agent once, then load the initial snapshot when one is given.
    ///
    /// A spawn that has not returned within the spawn timeout is abandoned
    /// and logged, and startup continues without it. Spawning carries no
    /// completion signal, so the instance may still come up on its own.
    #[instrument(skip(self, initial), fields(agents = self.agents.len()))]
    pub async fn start(&mut self, initial: Option<Bytes>) -> Result<()> {
        let timeout = Duration::from_millis(self.config.spawn_timeout_ms);
        let spawns = self.agents.iter_mut().map(|agent| async move {
            let name = agent.name().to_string();
            (name, tokio::time::timeout(timeout, agent.spawn()).await)
        });
        for (name, spawned) in join_all(spawns).await {
            match spawned {
                Ok(result) => result?,
                Err(_) => warn!(
                    agent = %name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Spawn still pending, continuing"
                ),
            }
        }

        debug!(settle_ms = self.config.settle_delay_ms, "Waiting for instances to settle");
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        for agent in &mut self.agents {
            agent.configure().await?;
        }

        if let Some(snapshot) = initial {
            for agent in &mut self.agents {
                agent.store_snapshot(snapshot.clone());
                agent.reload().await?;
            }
            info!(bytes = snapshot.len(), "Loaded initial snapshot");
        }

        info!("Swarm started");
        Ok(())
    }

    /// Run attempts until one improves the best record or `cancel` is raised.
    /// The flag is checked before every attempt.
    #[instrument(skip(self, cancel), fields(round = self.rounds_finalized + 1))]
    pub async fn run_round(&mut self, cancel: &CancellationFlag) -> Result<RoundOutcome> {
        let mut attempts = 0u64;
        loop {
            if cancel.is_cancelled() {
                info!(attempts, "Round cancelled");
                self.phase = RoundPhase::Idle;
                return Ok(RoundOutcome::Cancelled { attempts });
            }

            attempts += 1;
            match self.attempt().await {
                Ok(AttemptOutcome::Improved(report)) => {
                    self.phase = RoundPhase::Idle;
                    return Ok(RoundOutcome::Finalized { attempts, report });
                }
                Ok(AttemptOutcome::Stagnated(_)) => continue,
                Err(e) => {
                    self.phase = RoundPhase::Idle;
                    return Err(e);
                }
            }
        }
    }

    /// One pass of generate, execute, persist, score and select, followed by
    /// either finalization or budget growth.
    ///
    /// If propagation fails the attempt returns the error with the record,
    /// budgets, generation counts and snapshot slots as they were after
    /// scoring.
    pub async fn attempt(&mut self) -> Result<AttemptOutcome> {
        self.phase = RoundPhase::Generate;
        for agent in &mut self.agents {
            agent.plan_actions(&mut self.rng);
        }
        let schedule = dispatch_schedule(self.agents.iter().map(Agent::last_actions));
        let steps = schedule.len();

        self.phase = RoundPhase::Execute;
        let mut actions_dispatched = 0usize;
        for due in &schedule {
            for action in due {
                for agent in &mut self.agents {
                    agent.execute(action).await?;
                }
            }
            actions_dispatched += due.len();
        }
        self.metrics.actions_dispatched.inc_by(actions_dispatched as u64);
        debug!(steps, actions_dispatched, "Dispatched actions");

        self.phase = RoundPhase::Persist;
        for agent in &mut self.agents {
            agent.persist().await?;
        }

        self.phase = RoundPhase::Score;
        for agent in &mut self.agents {
            let started = Instant::now();
            let score = self.estimator.score(agent.snapshot());
            let elapsed = started.elapsed();
            self.metrics.scoring_duration_seconds.observe(elapsed.as_secs_f64());
            agent.record_fitness(score);
            debug!(
                agent = %agent.name(),
                score,
                delta = agent.fitness_delta(),
                elapsed_us = elapsed.as_micros() as u64,
                "Scored snapshot"
            );
        }

        self.phase = RoundPhase::Select;
        let mode = self.policy.mode();
        let values: Vec<f64> = self.agents.iter().map(|a| a.comparison_value(mode)).collect();
        let (winner, value) = self
            .policy
            .select_winner(&values)
            .ok_or_else(|| SwarmError::Internal("empty population".into()))?;
        let winner_idle = self.agents[winner].is_idle();
        let winner_name = self.agents[winner].name().to_string();

        if self.policy.is_improvement(value, self.best_record_ever) {
            self.phase = RoundPhase::Finalize;

            // Nothing is committed until every agent has reloaded the winner.
            let slots: Vec<Bytes> = self.agents.iter().map(|a| a.snapshot().clone()).collect();
            if let Err(e) = self.propagate(winner).await {
                for (agent, slot) in self.agents.iter_mut().zip(slots) {
                    agent.store_snapshot(slot);
                }
                warn!(winner = %winner_name, error = %e, "Propagation failed, round not finalized");
                return Err(e);
            }

            info!(
                winner = %winner_name,
                value,
                previous = self.best_record_ever,
                "New record"
            );
            self.best_record_ever = value;
            self.metrics.best_fitness.set(value);
            for agent in &mut self.agents {
                agent.reset_budget();
            }

            self.phase = RoundPhase::Advance;
            for agent in &mut self.agents {
                agent.advance_generation();
            }
            self.rounds_finalized += 1;
            self.metrics.rounds_finalized.inc();

            Ok(AttemptOutcome::Improved(AttemptReport {
                winner,
                winner_name,
                winner_idle,
                value,
                record: self.best_record_ever,
                steps,
                actions_dispatched,
            }))
        } else {
            self.phase = RoundPhase::Retry;
            let growth = self.policy.growth(winner_idle);
            for agent in &mut self.agents {
                match growth {
                    BudgetGrowth::Double => agent.double_budget(),
                    BudgetGrowth::Increment => agent.increment_budget(),
                }
            }
            self.metrics.round_retries.inc();
            info!(
                winner = %winner_name,
                value,
                record = self.best_record_ever,
                growth = ?growth,
                "No new record, growing step budgets"
            );

            Ok(AttemptOutcome::Stagnated(AttemptReport {
                winner,
                winner_name,
                winner_idle,
                value,
                record: self.best_record_ever,
                steps,
                actions_dispatched,
            }))
        }
    }

    /// Copy the winner's snapshot into every other slot, then reload all
    /// agents, winner included, from their slots. `winner` is a position in
    /// the population.
    async fn propagate(&mut self, winner: usize) -> Result<()> {
        self.phase = RoundPhase::Propagate;
        let snapshot = self.agents[winner].snapshot().clone();
        for (_, agent) in self
            .agents
            .iter_mut()
            .enumerate()
            .filter(|(position, _)| *position != winner)
        {
            agent.store_snapshot(snapshot.clone());
        }
        for agent in &mut self.agents {
            agent.reload().await?;
        }
        debug!(winner, bytes = snapshot.len(), "Propagated winning snapshot");
        Ok(())
    }

    /// Stop every environment. All agents are attempted; the first error is
    /// returned.
    #[instrument(skip(self))]
    pub async fn teardown(&mut self) -> Result<()> {
        let mut first_error = None;
        for agent in &mut self.agents {
            if let Err(e) = agent.teardown().await {
                warn!(agent = %agent.name(), error = %e, "Teardown failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        info!(rounds = self.rounds_finalized, "Swarm torn down");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for SwarmController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwarmController")
            .field("agents", &self.agents)
            .field("fitness_mode", &self.policy.mode())
            .field("best_record_ever", &self.best_record_ever)
            .field("phase", &self.phase)
            .field("rounds_finalized", &self.rounds_finalized)
            .finish()
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Distinct actions due at each step across the population, in order of
/// first occurrence by population order.
pub fn dispatch_schedule<'a, I>(plans: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let plans: Vec<&[String]> = plans.into_iter().collect();
    let steps = plans.iter().map(|plan| plan.len()).max().unwrap_or(0);

    (0..steps)
        .map(|step| {
            let mut due: Vec<String> = Vec::new();
            for action in plans.iter().filter_map(|plan| plan.get(step)) {
                if !due.contains(action) {
                    due.push(action.clone());
                }
            }
            due
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::SimulatedEnvironment;
    use entroswarm_common::{ConfigurationError, GridLayout, LogicalAction};

    fn plan(actions: &[&str]) -> Vec<String> {
        actions.iter().map(|a| a.to_string()).collect()
    }

    fn pool() -> Vec<PhysicalKey> {
        (b'a'..=b'z')
            .map(|c| PhysicalKey::new(c as u32 - 32, (c as char).to_string()))
            .collect()
    }

    fn simulated(descriptor: &AgentDescriptor) -> Result<Box<dyn Environment>> {
        Ok(Box::new(SimulatedEnvironment::new(descriptor.name.clone())))
    }

    fn config(columns: usize, rows: usize, idle: bool) -> SwarmConfig {
        SwarmConfig {
            layout: GridLayout::new(columns, rows, 245, 215),
            include_idle_agent: idle,
            seed: Some(11),
            settle_delay_ms: 0,
            ..SwarmConfig::default()
        }
    }

    #[test]
    fn test_schedule_collapses_duplicates_in_first_occurrence_order() {
        let plans = [plan(&["b", "x"]), plan(&["a", "x", "q"]), plan(&["b"])];
        let schedule = dispatch_schedule(plans.iter().map(Vec::as_slice));
        assert_eq!(
            schedule,
            vec![plan(&["b", "a"]), plan(&["x"]), plan(&["q"])]
        );
    }

    #[test]
    fn test_schedule_of_idle_population_is_empty() {
        let plans: [Vec<String>; 2] = [Vec::new(), Vec::new()];
        assert!(dispatch_schedule(plans.iter().map(Vec::as_slice)).is_empty());
    }

    #[test]
    fn test_grid_population_names_and_placements() {
        let controller = SwarmController::new(config(2, 2, true), pool(), simulated).unwrap();
        let names: Vec<&str> = controller.agents().iter().map(Agent::name).collect();
        assert_eq!(names, vec!["agent-0-0", "agent-0-1", "agent-1-0", "idle-1-1"]);

        let last = &controller.agents()[3];
        assert!(last.is_idle());
        assert_eq!(last.placement(), Placement::new(245, 215));
        assert_eq!(last.base_step_budget(), 0);
        assert_eq!(controller.agents()[1].placement(), Placement::new(0, 215));
    }

    #[test]
    fn test_bindings_cover_every_action_once() {
        let controller = SwarmController::new(config(3, 2, false), pool(), simulated).unwrap();
        for agent in controller.agents() {
            let actions: Vec<LogicalAction> = agent.bindings().iter().map(|b| b.action).collect();
            assert_eq!(actions, LogicalAction::ALL.to_vec());
        }
    }

    #[test]
    fn test_initial_record_by_mode() {
        let mut cfg = config(1, 2, false);
        cfg.fitness_mode = FitnessMode::Min;
        let controller = SwarmController::new(cfg, pool(), simulated).unwrap();
        assert_eq!(controller.best_record_ever(), f64::INFINITY);
        assert_eq!(controller.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_reverse_mode_needs_two_assignable_agents() {
        let mut cfg = config(1, 2, true);
        cfg.exploration_mode = ExplorationMode::RandomAndItsReverse;
        let err = SwarmController::new(cfg, pool(), simulated).unwrap_err();
        assert!(matches!(
            err,
            SwarmError::Configuration(ConfigurationError::InsufficientPopulation { required: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_empty_key_pool_is_fatal() {
        let err = SwarmController::new(config(2, 1, false), Vec::new(), simulated).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_factory_error_aborts_construction() {
        let result = SwarmController::new(config(2, 1, false), pool(), |d: &AgentDescriptor| {
            Err(SwarmError::unavailable(&d.name, "spawn", "binary missing"))
        });
        assert!(matches!(result, Err(SwarmError::CollaboratorUnavailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_configures_and_loads_initial_snapshot() {
        let mut controller = SwarmController::new(config(2, 1, false), pool(), simulated).unwrap();
        let initial = {
            let mut env = SimulatedEnvironment::new("seed");
            env.spawn().await.unwrap();
            env.persist_state().await.unwrap()
        };
        controller.start(Some(initial.clone())).await.unwrap();
        for agent in controller.agents() {
            assert_eq!(agent.snapshot(), &initial);
        }
    }
}
