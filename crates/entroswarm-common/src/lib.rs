//! # Entroswarm Common
//!
//! Shared types and errors for the Entroswarm save-state explorer.
//!
//! ## Core Types
//!
//! - [`LogicalAction`], [`PhysicalKey`], [`KeyBinding`]: what an agent can press
//! - [`ExplorationMode`], [`FitnessMode`], [`ActionMode`]: closed strategy variants
//! - [`Placement`], [`GridLayout`]: where each agent's window sits
//! - [`SwarmError`], [`ConfigurationError`]: the error taxonomy

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{ConfigurationError, Result, SwarmError};
pub use types::{
    key_binding::{bind_in_order, no_key_bindings, KeyBinding, LogicalAction, PhysicalKey},
    layout::{GridLayout, Placement},
    modes::{ActionMode, ExplorationMode, FitnessMode},
};

/// Entroswarm version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Step budget an agent starts each improving round with
pub const BASE_STEPS: usize = 100;

/// Budget growth per stagnant round under delta mode or an idle win
pub const INCREMENT_STEPS: usize = 50;
