//! Agent: one controlled instance and its per-round search state

use bytes::Bytes;
use entroswarm_common::{
    no_key_bindings, ActionMode, FitnessMode, KeyBinding, Placement, Result,
};
use rand::Rng;
use tracing::trace;
use uuid::Uuid;

use crate::environment::Environment;
use crate::strategy::ActionGenerator;

/// Construction parameters for one agent
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub name: String,
    pub bindings: Vec<KeyBinding>,
    pub action_mode: ActionMode,
    pub placement: Placement,
    pub base_step_budget: usize,
    pub step_increment: usize,
}

impl AgentSpec {
    /// Idle control agent: no keys, never acts, no budget
    pub fn idle(name: impl Into<String>, placement: Placement) -> Self {
        Self {
            name: name.into(),
            bindings: no_key_bindings(),
            action_mode: ActionMode::Still,
            placement,
            base_step_budget: 0,
            step_increment: 0,
        }
    }
}

/// One member of the population.
///
/// Bindings, placement and mode are fixed at construction. Budget,
/// generation count, fitness history and the snapshot slot change every round.
pub struct Agent {
    id: Uuid,
    index: usize,
    name: String,
    bindings: Vec<KeyBinding>,
    generator: ActionGenerator,
    placement: Placement,
    step_budget: usize,
    base_step_budget: usize,
    step_increment: usize,
    generation_count: u64,
    last_actions: Vec<String>,
    current_fitness: f64,
    previous_fitness: f64,
    fitness_delta: f64,
    snapshot: Bytes,
    environment: Box<dyn Environment>,
}

impl Agent {
    pub fn new(index: usize, spec: AgentSpec, environment: Box<dyn Environment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            name: spec.name,
            bindings: spec.bindings,
            generator: ActionGenerator::new(spec.action_mode),
            placement: spec.placement,
            step_budget: spec.base_step_budget,
            base_step_budget: spec.base_step_budget,
            step_increment: spec.step_increment,
            generation_count: 0,
            last_actions: Vec::new(),
            current_fitness: 0.0,
            previous_fitness: 0.0,
            fitness_delta: 0.0,
            snapshot: Bytes::new(),
            environment,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Position in the population
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn action_mode(&self) -> ActionMode {
        self.generator.mode()
    }

    /// The designated always-idle control agent
    pub fn is_idle(&self) -> bool {
        self.generator.mode() == ActionMode::Still
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn step_budget(&self) -> usize {
        self.step_budget
    }

    pub fn base_step_budget(&self) -> usize {
        self.base_step_budget
    }

    pub fn step_increment(&self) -> usize {
        self.step_increment
    }

    pub fn generation_count(&self) -> u64 {
        self.generation_count
    }

    /// Actions produced for the current round
    pub fn last_actions(&self) -> &[String] {
        &self.last_actions
    }

    pub fn current_fitness(&self) -> f64 {
        self.current_fitness
    }

    pub fn previous_fitness(&self) -> f64 {
        self.previous_fitness
    }

    pub fn fitness_delta(&self) -> f64 {
        self.fitness_delta
    }

    /// Contents of this agent's snapshot slot
    pub fn snapshot(&self) -> &Bytes {
        &self.snapshot
    }

    /// Value ranked under the given fitness mode
    pub fn comparison_value(&self, mode: FitnessMode) -> f64 {
        match mode {
            FitnessMode::Max | FitnessMode::Min => self.current_fitness,
            FitnessMode::Delta => self.fitness_delta,
        }
    }

    /// Draw this round's actions and keep them as `last_actions`
    pub fn plan_actions<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &[String] {
        self.last_actions = self.generator.generate(&self.bindings, self.step_budget, rng);
        &self.last_actions
    }

    /// Shift the current score into history; keeps `delta == |current - previous|`
    pub fn record_fitness(&mut self, score: f64) {
        self.previous_fitness = self.current_fitness;
        self.current_fitness = score;
        self.fitness_delta = (self.current_fitness - self.previous_fitness).abs();
    }

    pub fn reset_budget(&mut self) {
        self.step_budget = self.base_step_budget;
    }

    pub fn double_budget(&mut self) {
        self.step_budget = self.step_budget.saturating_mul(2);
    }

    pub fn increment_budget(&mut self) {
        self.step_budget = self.step_budget.saturating_add(self.step_increment);
    }

    pub fn advance_generation(&mut self) {
        self.generation_count += 1;
    }

    /// Overwrite the snapshot slot
    pub fn store_snapshot(&mut self, snapshot: Bytes) {
        self.snapshot = snapshot;
    }

    pub async fn spawn(&mut self) -> Result<()> {
        self.environment.spawn().await
    }

    pub async fn configure(&mut self) -> Result<()> {
        self.environment
            .configure(&self.bindings, self.placement)
            .await
    }

    pub async fn execute(&mut self, action: &str) -> Result<()> {
        self.environment.execute(action).await
    }

    /// Persist the instance and fill the snapshot slot with the result
    pub async fn persist(&mut self) -> Result<&Bytes> {
        self.snapshot = self.environment.persist_state().await?;
        trace!(agent = %self.name, bytes = self.snapshot.len(), "Persisted snapshot");
        Ok(&self.snapshot)
    }

    /// Reload the instance from its snapshot slot
    pub async fn reload(&mut self) -> Result<()> {
        self.environment.load_state(&self.snapshot).await
    }

    pub async fn teardown(&mut self) -> Result<()> {
        self.environment.teardown().await
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("mode", &self.generator.mode())
            .field("step_budget", &self.step_budget)
            .field("generation_count", &self.generation_count)
            .field("current_fitness", &self.current_fitness)
            .field("fitness_delta", &self.fitness_delta)
            .finish()
    }
}
