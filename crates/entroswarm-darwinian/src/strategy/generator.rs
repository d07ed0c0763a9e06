//! Per-round action generation

use entroswarm_common::{ActionMode, KeyBinding};
use rand::seq::SliceRandom;
use rand::Rng;

/// Produces one agent's action sequence for a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionGenerator {
    mode: ActionMode,
}

impl ActionGenerator {
    pub fn new(mode: ActionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ActionMode {
        self.mode
    }

    /// Draw this round's key names.
    ///
    /// `AllRandom` samples `step_budget` bindings uniformly with replacement
    /// across the whole binding list; `Still` always returns nothing.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        bindings: &[KeyBinding],
        step_budget: usize,
        rng: &mut R,
    ) -> Vec<String> {
        match self.mode {
            ActionMode::AllRandom => (0..step_budget)
                .filter_map(|_| bindings.choose(rng))
                .map(|binding| binding.key.name.clone())
                .collect(),
            ActionMode::Still => Vec::new(),
        }
    }
}

impl From<ActionMode> for ActionGenerator {
    fn from(mode: ActionMode) -> Self {
        Self::new(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entroswarm_common::{bind_in_order, PhysicalKey};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bindings() -> Vec<KeyBinding> {
        bind_in_order(["q", "w", "e", "r", "t", "y"].iter().enumerate().map(|(i, name)| {
            PhysicalKey::new(81 + i as u32, *name)
        }))
    }

    #[test]
    fn test_all_random_length_matches_budget() {
        let mut rng = StdRng::seed_from_u64(7);
        let generator = ActionGenerator::new(ActionMode::AllRandom);
        let actions = generator.generate(&bindings(), 250, &mut rng);

        assert_eq!(actions.len(), 250);
        let names: Vec<String> = bindings().into_iter().map(|b| b.key.name).collect();
        assert!(actions.iter().all(|a| names.contains(a)));
    }

    #[test]
    fn test_all_random_zero_budget_is_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        let generator = ActionGenerator::new(ActionMode::AllRandom);
        assert!(generator.generate(&bindings(), 0, &mut rng).is_empty());
    }

    #[test]
    fn test_still_ignores_budget() {
        let mut rng = StdRng::seed_from_u64(7);
        let generator = ActionGenerator::new(ActionMode::Still);
        for budget in [0, 1, 100, 10_000] {
            assert!(generator.generate(&bindings(), budget, &mut rng).is_empty());
        }
    }

    #[test]
    fn test_all_random_draws_every_binding_eventually() {
        let mut rng = StdRng::seed_from_u64(11);
        let generator = ActionGenerator::new(ActionMode::AllRandom);
        let actions = generator.generate(&bindings(), 2_000, &mut rng);
        for binding in bindings() {
            assert!(actions.contains(&binding.key.name));
        }
    }
}
