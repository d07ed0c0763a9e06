//! Fitness estimation from persisted snapshots
pub mod entropy;

pub use self::entropy::{chunk_entropy, EntropyEstimator};
