//! CLI command implementations
//!
//! Every command computes one JSON value; `run_command` writes it. Errors
//! are written as a JSON error object on stdout and returned so `main`
//! can print them to stderr and exit non-zero.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::flags::{FlagId, FlagState, InputSource};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::resolution::{resolve, ResolutionInput, ResolutionReport};
use crate::resolver::ResolverOptions;
use crate::table::RuleTable;

use super::args::{Command, Overrides};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Environment variable overriding the configured log level
pub const LOG_ENV_VAR: &str = "CFGRESOLVER_LOG";

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Explicit flag settings: "enabled" or "disabled". A flag may appear
    /// only once.
    #[serde(default, deserialize_with = "unique_flags")]
    pub flags: BTreeMap<String, FlagState>,

    /// Capabilities that must resolve available
    #[serde(default)]
    pub require_capabilities: Vec<String>,

    /// Pass bound override (optional, default rule count + 1)
    #[serde(default)]
    pub max_passes: Option<usize>,

    /// Minimum log severity (optional, default "warn")
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Reads the `flags` map, rejecting any name given twice.
fn unique_flags<'de, D>(deserializer: D) -> Result<BTreeMap<String, FlagState>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueFlags;

    impl<'de> Visitor<'de> for UniqueFlags {
        type Value = BTreeMap<String, FlagState>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of flag name to \"enabled\" or \"disabled\"")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut flags = BTreeMap::new();
            while let Some((name, state)) = access.next_entry::<String, FlagState>()? {
                if flags.contains_key(&name) {
                    return Err(de::Error::custom(format!("duplicate flag '{}'", name)));
                }
                flags.insert(name, state);
            }
            Ok(flags)
        }
    }

    deserializer.deserialize_map(UniqueFlags)
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config = Self::from_json(&content)?;

        let path_str = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path_str.as_str())]);

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        for (name, state) in &self.flags {
            if !FlagId::new(name.as_str()).is_valid() {
                return Err(CliError::config_error(format!(
                    "Invalid flag identifier: '{}'",
                    name
                )));
            }
            if *state == FlagState::Unset {
                return Err(CliError::config_error(format!(
                    "Flag '{}' must be 'enabled' or 'disabled'",
                    name
                )));
            }
        }

        if let Some(empty) = self.require_capabilities.iter().find(|c| c.is_empty()) {
            return Err(CliError::config_error(format!(
                "Invalid capability name: '{}'",
                empty
            )));
        }

        if self.max_passes == Some(0) {
            return Err(CliError::config_error("max_passes must be > 0"));
        }

        if let Some(level) = &self.log_level {
            if Severity::parse(level).is_none() {
                return Err(CliError::config_error(format!(
                    "Invalid log_level: '{}'",
                    level
                )));
            }
        }

        Ok(())
    }

    /// Builds resolution input from this config and command-line overrides.
    ///
    /// Overrides replace config-file values for the same flag. Enabling and
    /// disabling one flag on the command line is left in place so the flag
    /// store reports it as a conflict.
    pub fn to_input(&self, overrides: &Overrides) -> ResolutionInput {
        let mut input = ResolutionInput::new();
        for (name, state) in &self.flags {
            input.push(FlagId::new(name.as_str()), *state, InputSource::ConfigFile);
        }
        for name in &overrides.enable {
            input.override_flag(FlagId::new(name.as_str()), FlagState::Enabled);
        }
        for name in &overrides.disable {
            input.override_flag(FlagId::new(name.as_str()), FlagState::Disabled);
        }
        for capability in self.require_capabilities.iter().chain(&overrides.require) {
            input.add_requirement(capability.as_str());
        }
        input
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            max_passes: self.max_passes,
        }
    }

    /// Log level from the environment, else the config, else the default
    pub fn log_severity(&self) -> Severity {
        env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|level| Severity::parse(&level))
            .or_else(|| self.log_level.as_deref().and_then(Severity::parse))
            .unwrap_or(Severity::Warn)
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run a command and write its JSON response
pub fn run_command(cmd: Command) -> CliResult<()> {
    match execute(cmd) {
        Ok(data) => write_response(data),
        Err(err) => {
            write_error(&err)?;
            Err(err)
        }
    }
}

/// Run a command and return its JSON response without writing it
pub fn execute(cmd: Command) -> CliResult<Value> {
    match cmd {
        Command::Resolve { config, overrides } => {
            let config = load_optional(config.as_deref())?;
            resolve_command(&config, &overrides)
        }
        Command::Rules => rules_command(),
        Command::Capabilities => capabilities_command(),
        Command::Explain {
            config,
            flag,
            overrides,
        } => {
            let config = load_optional(config.as_deref())?;
            explain_command(&config, &overrides, &flag)
        }
    }
}

fn load_optional(path: Option<&Path>) -> CliResult<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    Logger::set_min_severity(config.log_severity());
    Ok(config)
}

fn builtin_table() -> CliResult<&'static RuleTable> {
    let table = RuleTable::builtin().map_err(crate::resolution::ResolutionError::from)?;
    let version = table.version().to_string();
    let rules = table.rules().len().to_string();
    log_event_with_fields(
        Event::RuleTableLoaded,
        &[("version", version.as_str()), ("rules", rules.as_str())],
    );
    Ok(table)
}

fn run_resolution(config: &Config, overrides: &Overrides) -> CliResult<(&'static RuleTable, ResolutionReport)> {
    let table = builtin_table()?;
    let input = config.to_input(overrides);
    let report = resolve(table, &input, config.resolver_options())?;
    Ok((table, report))
}

/// Resolve and report
pub fn resolve_command(config: &Config, overrides: &Overrides) -> CliResult<Value> {
    let (_, report) = run_resolution(config, overrides)?;
    let mut data = serde_json::to_value(&report)?;
    data["public_flags"] = serde_json::to_value(report.public_flags())?;
    Ok(data)
}

/// Dump the builtin rule table
pub fn rules_command() -> CliResult<Value> {
    let table = builtin_table()?;
    Ok(json!({
        "table_version": table.version(),
        "rules": table.rules(),
        "constraints": table.constraints(),
    }))
}

/// Dump the builtin capability definitions
pub fn capabilities_command() -> CliResult<Value> {
    let table = builtin_table()?;
    Ok(json!({
        "table_version": table.version(),
        "capabilities": table.capabilities(),
    }))
}

/// Resolve, then walk the provenance of one flag
pub fn explain_command(config: &Config, overrides: &Overrides, flag: &str) -> CliResult<Value> {
    let flag = FlagId::new(flag);
    if !flag.is_valid() {
        return Err(CliError::config_error(format!(
            "Invalid flag identifier: '{}'",
            flag
        )));
    }

    let (table, report) = run_resolution(config, overrides)?;
    let chain = report.explain(&flag, table.rules());
    let state = report.flags.get(&flag);
    let internal = report.internal.contains(&flag);
    Ok(json!({
        "flag": flag,
        "state": state,
        "internal": internal,
        "chain": chain,
    }))
}
