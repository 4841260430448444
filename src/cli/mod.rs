//! CLI module for cfgresolver
//!
//! Provides command-line interface for:
//! - resolve: Resolve a configuration against the builtin table
//! - rules: Dump the builtin rule table
//! - capabilities: Dump capability definitions
//! - explain: Show the provenance chain of one flag

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, Overrides};
pub use commands::{
    capabilities_command, execute, explain_command, resolve_command, rules_command, run,
    run_command, Config, LOG_ENV_VAR,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_error_to, write_response, write_response_to};
