//! Action generation and key assignment strategies
pub mod assigner;
pub mod generator;

pub use self::assigner::KeyBindingAssigner;
pub use self::generator::ActionGenerator;
