//! CLI module for texpipe - command-line interface and subcommands.
//!
//! Each subcommand maps onto one pipeline operation.

pub mod commands;

pub use commands::Cli;
