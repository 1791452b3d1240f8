//! External tool execution.
//!
//! - `spawn`: the raw process boundary and its tokio implementation
//! - `runner`: target-file update checks around each invocation
//! - `mock`: scripted spawner used by tests

pub mod mock;
pub mod runner;
pub mod spawn;

pub use mock::MockSpawner;
pub use runner::{CommandRunner, UPDATE_WINDOW};
pub use spawn::{ProcessCommand, ProcessOutput, Spawner, TokioSpawner};
