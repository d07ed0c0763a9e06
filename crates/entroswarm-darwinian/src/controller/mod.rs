//! Swarm controller module
pub mod cancel;
pub mod swarm;

pub use self::cancel::CancellationFlag;
pub use self::swarm::{
    dispatch_schedule, AgentDescriptor, AttemptOutcome, AttemptReport, RoundOutcome, RoundPhase,
    SwarmController,
};
