//! One-time key binding assignment for the population
//!
//! Each assignable agent receives one binding list covering every
//! [`LogicalAction`] exactly once, in canonical order. Lists are handed out by
//! flat agent index.

use std::collections::HashSet;

use entroswarm_common::{
    bind_in_order, ConfigurationError, ExplorationMode, KeyBinding, LogicalAction, PhysicalKey,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

/// Rejection draws allowed per binding slot before falling back to a shuffle
pub const MAX_REJECTION_ATTEMPTS: usize = 64;

/// Assigns physical keys to logical actions for every non-idle agent
#[derive(Debug, Clone)]
pub struct KeyBindingAssigner {
    mode: ExplorationMode,
    pool: Vec<PhysicalKey>,
    /// Pool with duplicates removed, in first-seen order
    distinct: Vec<PhysicalKey>,
}

impl KeyBindingAssigner {
    pub fn new(mode: ExplorationMode, pool: Vec<PhysicalKey>) -> Result<Self, ConfigurationError> {
        if pool.is_empty() {
            return Err(ConfigurationError::EmptyKeyPool);
        }

        let distinct: Vec<PhysicalKey> = {
            let mut seen = HashSet::new();
            pool.iter()
                .filter(|key| seen.insert(*key))
                .cloned()
                .collect()
        };

        Ok(Self {
            mode,
            pool,
            distinct,
        })
    }

    pub fn mode(&self) -> ExplorationMode {
        self.mode
    }

    pub fn pool(&self) -> &[PhysicalKey] {
        &self.pool
    }

    /// Binding lists for `count` agents, index `i` belonging to the `i`-th
    /// assignable agent.
    pub fn assign<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Vec<KeyBinding>>, ConfigurationError> {
        let required = self.mode.min_population();
        if count < required {
            return Err(ConfigurationError::InsufficientPopulation {
                mode: self.mode.to_string(),
                required,
                actual: count,
            });
        }

        let key_lists: Vec<Vec<PhysicalKey>> = match self.mode {
            ExplorationMode::AllRandom => (0..count).map(|_| self.draw(rng)).collect(),
            ExplorationMode::AllRandomNoInnerRepeat => {
                (0..count).map(|_| self.draw_without_repeats(rng)).collect()
            }
            ExplorationMode::RandomAndItsReverse => self.draw_pairs(count, rng),
        };

        debug!(mode = %self.mode, agents = count, "Assigned key bindings");
        Ok(key_lists.into_iter().map(bind_in_order).collect())
    }

    /// Independent uniform draw per logical action
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<PhysicalKey> {
        (0..LogicalAction::COUNT)
            .map(|_| self.pick(rng).clone())
            .collect()
    }

    fn draw_without_repeats<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<PhysicalKey> {
        if self.distinct.len() < LogicalAction::COUNT {
            warn!(
                distinct_keys = self.distinct.len(),
                actions = LogicalAction::COUNT,
                "Key pool too small for unique bindings, repeats unavoidable"
            );
            return self.shuffled(rng);
        }

        let mut keys: Vec<PhysicalKey> = Vec::with_capacity(LogicalAction::COUNT);
        for _ in 0..LogicalAction::COUNT {
            let drawn = (0..MAX_REJECTION_ATTEMPTS)
                .map(|_| self.pick(rng))
                .find(|candidate| !keys.contains(*candidate));

            match drawn {
                Some(key) => keys.push(key.clone()),
                None => {
                    debug!("Rejection sampling exhausted, using shuffled pool");
                    return self.shuffled(rng);
                }
            }
        }
        keys
    }

    /// Consecutive pairs: a fresh draw followed by its reversed key sequence.
    /// An unpaired last agent gets its own fresh draw.
    fn draw_pairs<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Vec<PhysicalKey>> {
        let mut lists = Vec::with_capacity(count);
        while lists.len() < count {
            let keys = self.draw(rng);
            if lists.len() + 1 < count {
                let reversed: Vec<PhysicalKey> = keys.iter().rev().cloned().collect();
                lists.push(keys);
                lists.push(reversed);
            } else {
                lists.push(keys);
            }
        }
        lists
    }

    /// Shuffle of the distinct pool, cycled when shorter than the action list
    fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<PhysicalKey> {
        let mut keys = self.distinct.clone();
        keys.shuffle(rng);
        keys.iter()
            .cycle()
            .take(LogicalAction::COUNT)
            .cloned()
            .collect()
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &PhysicalKey {
        &self.pool[rng.gen_range(0..self.pool.len())]
    }
}
