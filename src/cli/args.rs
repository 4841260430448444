//! CLI argument definitions using clap
//!
//! Commands:
//! - cfgresolver resolve [--config <path>] [--enable F] [--disable F] [--require C]
//! - cfgresolver rules
//! - cfgresolver capabilities
//! - cfgresolver explain --flag F [--config <path>] [overrides]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// cfgresolver - A strict, deterministic build-feature configuration resolver
#[derive(Parser, Debug)]
#[command(name = "cfgresolver")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Command-line flag settings. These replace config-file values for the
/// same flag.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Enable a flag
    #[arg(long = "enable", value_name = "FLAG")]
    pub enable: Vec<String>,

    /// Explicitly disable a flag
    #[arg(long = "disable", value_name = "FLAG")]
    pub disable: Vec<String>,

    /// Require a capability to be available
    #[arg(long = "require", value_name = "CAPABILITY")]
    pub require: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve a configuration and print the report
    Resolve {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Print the builtin rule table
    Rules,

    /// Print the builtin capability definitions
    Capabilities,

    /// Resolve a configuration and print why a flag has its state
    Explain {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Flag to explain
        #[arg(long)]
        flag: String,

        #[command(flatten)]
        overrides: Overrides,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
