//! Strategy modes
//!
//! Mode names arrive as strings from configuration and are parsed exactly once,
//! at construction. An unrecognized name is a [`ConfigurationError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// How key bindings are assigned to the population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplorationMode {
    /// Independent uniform draw per logical action, repeats allowed
    AllRandom,
    /// Independent draw without repeats inside one agent
    AllRandomNoInnerRepeat,
    /// Consecutive pairs: a random list and its reverse
    RandomAndItsReverse,
}

impl ExplorationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplorationMode::AllRandom => "ALL_RANDOM",
            ExplorationMode::AllRandomNoInnerRepeat => "ALL_RANDOM_NO_INNER_REPEAT",
            ExplorationMode::RandomAndItsReverse => "RANDOM_AND_ITS_REVERSE",
        }
    }

    /// Minimum number of assignable agents the mode can work with
    pub fn min_population(&self) -> usize {
        match self {
            ExplorationMode::RandomAndItsReverse => 2,
            _ => 0,
        }
    }
}

impl FromStr for ExplorationMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ALL_RANDOM" => Ok(ExplorationMode::AllRandom),
            "ALL_RANDOM_NO_INNER_REPEAT" => Ok(ExplorationMode::AllRandomNoInnerRepeat),
            "RANDOM_AND_ITS_REVERSE" => Ok(ExplorationMode::RandomAndItsReverse),
            other => Err(ConfigurationError::UnknownExplorationMode(other.to_string())),
        }
    }
}

impl fmt::Display for ExplorationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which per-agent value ranks the population and how a record is beaten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessMode {
    /// Highest entropy wins
    Max,
    /// Lowest entropy wins
    Min,
    /// Largest entropy change since the previous scoring wins
    Delta,
}

impl FitnessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessMode::Max => "max",
            FitnessMode::Min => "min",
            FitnessMode::Delta => "delta",
        }
    }

    /// Starting value of the best-ever record
    pub fn initial_record(&self) -> f64 {
        match self {
            FitnessMode::Max | FitnessMode::Delta => 0.0,
            FitnessMode::Min => f64::INFINITY,
        }
    }

    /// Whether `candidate` is at least as good as `best` (tie counts)
    pub fn at_least_as_good(&self, candidate: f64, best: f64) -> bool {
        match self {
            FitnessMode::Max | FitnessMode::Delta => candidate >= best,
            FitnessMode::Min => candidate <= best,
        }
    }

    /// Whether `candidate` strictly beats the best-ever `record`
    pub fn improves(&self, candidate: f64, record: f64) -> bool {
        match self {
            FitnessMode::Max | FitnessMode::Delta => candidate > record,
            FitnessMode::Min => candidate < record,
        }
    }
}

impl FromStr for FitnessMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "max" => Ok(FitnessMode::Max),
            "min" => Ok(FitnessMode::Min),
            "delta" => Ok(FitnessMode::Delta),
            other => Err(ConfigurationError::UnknownFitnessMode(other.to_string())),
        }
    }
}

impl fmt::Display for FitnessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an agent produces its action sequence each round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionMode {
    /// `step_budget` uniform draws over the agent's bound keys
    AllRandom,
    /// Never acts
    Still,
}

impl ActionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMode::AllRandom => "ALL_RANDOM",
            ActionMode::Still => "STILL",
        }
    }
}

impl FromStr for ActionMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ALL_RANDOM" => Ok(ActionMode::AllRandom),
            "STILL" => Ok(ActionMode::Still),
            other => Err(ConfigurationError::UnknownActionMode(other.to_string())),
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
