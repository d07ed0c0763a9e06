//! Selection policy: winner, improvement test, and budget growth on stagnation

use entroswarm_common::FitnessMode;

/// How every agent's step budget grows after a stagnant round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetGrowth {
    /// `budget *= 2`
    Double,
    /// `budget += step_increment`
    Increment,
}

pub struct SelectionPolicy {
    mode: FitnessMode,
}

impl SelectionPolicy {
    pub fn new(mode: FitnessMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> FitnessMode {
        self.mode
    }

    /// Index and value of the best comparison value.
    ///
    /// Scans in population order and moves the winner on every value at
    /// least as good as the current best, so the later index wins ties.
    pub fn select_winner(&self, values: &[f64]) -> Option<(usize, f64)> {
        let mut values = values.iter().copied().enumerate();
        let (mut winner, mut best) = values.next()?;
        for (index, value) in values {
            if self.mode.at_least_as_good(value, best) {
                winner = index;
                best = value;
            }
        }
        Some((winner, best))
    }

    /// Whether `value` strictly beats the best-ever `record`
    pub fn is_improvement(&self, value: f64, record: f64) -> bool {
        self.mode.improves(value, record)
    }

    /// Growth applied when no improvement was found. An idle winner always
    /// grows by the fixed increment.
    pub fn growth(&self, winner_is_idle: bool) -> BudgetGrowth {
        if winner_is_idle {
            return BudgetGrowth::Increment;
        }
        match self.mode {
            FitnessMode::Max | FitnessMode::Min => BudgetGrowth::Double,
            FitnessMode::Delta => BudgetGrowth::Increment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_tie_wins_under_max() {
        let policy = SelectionPolicy::new(FitnessMode::Max);
        assert_eq!(policy.select_winner(&[5.0, 9.0, 9.0]), Some((2, 9.0)));
    }

    #[test]
    fn test_min_selects_smallest_later_tie() {
        let policy = SelectionPolicy::new(FitnessMode::Min);
        assert_eq!(policy.select_winner(&[3.0, 1.0, 4.0, 1.0, 5.0]), Some((3, 1.0)));
    }

    #[test]
    fn test_delta_selects_largest() {
        let policy = SelectionPolicy::new(FitnessMode::Delta);
        assert_eq!(policy.select_winner(&[0.2, 0.7, 0.1]), Some((1, 0.7)));
    }

    #[test]
    fn test_all_equal_picks_last() {
        let policy = SelectionPolicy::new(FitnessMode::Max);
        assert_eq!(policy.select_winner(&[1.0, 1.0, 1.0, 1.0]), Some((3, 1.0)));
    }

    #[test]
    fn test_empty_population_has_no_winner() {
        let policy = SelectionPolicy::new(FitnessMode::Max);
        assert_eq!(policy.select_winner(&[]), None);
    }

    #[test]
    fn test_improvement_against_initial_record() {
        let max = SelectionPolicy::new(FitnessMode::Max);
        assert!(!max.is_improvement(0.0, FitnessMode::Max.initial_record()));
        assert!(max.is_improvement(0.1, FitnessMode::Max.initial_record()));

        let min = SelectionPolicy::new(FitnessMode::Min);
        assert!(min.is_improvement(7.0, FitnessMode::Min.initial_record()));
    }

    #[test]
    fn test_growth_by_mode() {
        assert_eq!(SelectionPolicy::new(FitnessMode::Max).growth(false), BudgetGrowth::Double);
        assert_eq!(SelectionPolicy::new(FitnessMode::Min).growth(false), BudgetGrowth::Double);
        assert_eq!(
            SelectionPolicy::new(FitnessMode::Delta).growth(false),
            BudgetGrowth::Increment
        );
    }

    #[test]
    fn test_idle_winner_always_increments() {
        for mode in [FitnessMode::Max, FitnessMode::Min, FitnessMode::Delta] {
            assert_eq!(SelectionPolicy::new(mode).growth(true), BudgetGrowth::Increment);
        }
    }
}
