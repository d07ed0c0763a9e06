//! Infrastructure behind the environment seam
pub mod ini;
pub mod process;

pub use self::process::ProcessEnvironment;
