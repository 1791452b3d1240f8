//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - create: build main documents for the selected targets
//! - clear: remove generated files from the source tree
//! - graphics: convert graphics only
//! - settings: print the effective settings

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use texpipe::engine::Target;

/// texpipe - builds LaTeX documents, rerunning tools until their logs settle
#[derive(Parser, Debug)]
#[command(name = "texpipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LaTeX source directory, overriding the config
    #[arg(short, long, global = true)]
    pub source_dir: Option<PathBuf>,

    /// Subcommand to execute; `create` if omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build all main documents and copy the results to the output directory
    Create {
        /// Targets to build, comma separated (default from config)
        #[arg(short, long, value_enum, value_delimiter = ',')]
        target: Vec<Target>,

        /// Output directory, overriding the config
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Keep files the build created in the source tree
        #[arg(long)]
        keep: bool,
    },

    /// Delete files generated from graphics and main documents
    Clear,

    /// Convert graphics and list the main documents found
    Graphics,

    /// Print the effective settings as YAML
    Settings,
}
