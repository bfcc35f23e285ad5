//! Port traits (interfaces) for dependency injection

pub mod executor;

pub use executor::{ShellExecutor, SimulatedShell};
