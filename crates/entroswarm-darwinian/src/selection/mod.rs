//! Selection: which agent's state seeds the next round
pub mod policy;

pub use self::policy::{BudgetGrowth, SelectionPolicy};
