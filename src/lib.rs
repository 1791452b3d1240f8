//! texpipe - drives LaTeX toolchains over a source tree
//!
//! LaTeX and its helpers are treated as opaque tools. Which of them run, and
//! how often, is decided from the files they leave behind: timestamps of
//! their outputs and regex matches in their logs.

pub mod artifact;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod files;
pub mod graphics;
pub mod logging;
pub mod pipeline;

pub use error::{BuildError, Result};
pub use pipeline::Pipeline;
