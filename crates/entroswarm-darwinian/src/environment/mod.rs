//! Environment collaborator
//!
//! The controller never knows how an input is delivered or how a snapshot is
//! stored; it only drives these six operations. Implementations own their
//! own recovery (for example, rewriting a configuration until it verifies)
//! and report [`SwarmError::CollaboratorUnavailable`] once that is exhausted.
//!
//! [`SwarmError::CollaboratorUnavailable`]: entroswarm_common::SwarmError::CollaboratorUnavailable

pub mod simulated;

use async_trait::async_trait;
use bytes::Bytes;
use entroswarm_common::{KeyBinding, Placement, Result};

pub use self::simulated::{SimulatedEnvironment, SimulationProbe};

/// One controlled instance
#[async_trait]
pub trait Environment: Send {
    /// Start the instance. Completion is not acknowledged; the controller
    /// waits a settle delay instead.
    async fn spawn(&mut self) -> Result<()>;

    /// One-time setup of bindings and window placement
    async fn configure(&mut self, bindings: &[KeyBinding], placement: Placement) -> Result<()>;

    /// Deliver one input symbol
    async fn execute(&mut self, action: &str) -> Result<()>;

    /// Record the current state and return its exact bytes
    async fn persist_state(&mut self) -> Result<Bytes>;

    /// Restore the instance from a snapshot
    async fn load_state(&mut self, snapshot: &Bytes) -> Result<()>;

    /// Stop the instance
    async fn teardown(&mut self) -> Result<()>;
}
