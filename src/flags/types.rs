//! Flag type definitions
//!
//! A flag is a named boolean build switch (`MBEDTLS_ECP_C`, `PSA_WANT_ALG_ECDH`).
//! Every flag the store has touched carries its tri-state value and the
//! provenance of that value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::RuleId;

/// Identifier of a configuration flag.
///
/// Identifiers follow C macro naming: an ASCII letter or underscore, then
/// ASCII letters, digits or underscores. Construction does not validate;
/// the store and the rule set reject invalid identifiers when they are used.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagId(String);

impl FlagId {
    /// Creates a flag identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is a well-formed flag name.
    pub fn is_valid(&self) -> bool {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlagId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for FlagId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Tri-state value of a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagState {
    /// Never touched by the user or by a rule
    #[default]
    Unset,
    /// Enabled explicitly or by a rule
    Enabled,
    /// Explicitly disabled by the user; rules may never enable it
    Disabled,
}

impl FlagState {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagState::Unset => "unset",
            FlagState::Enabled => "enabled",
            FlagState::Disabled => "disabled",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self == FlagState::Enabled
    }
}

impl fmt::Display for FlagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an explicit flag value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputSource {
    /// User-editable configuration file
    ConfigFile,
    /// Command-line override
    CommandLine,
    /// Programmatic input
    Api,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::ConfigFile => "config_file",
            InputSource::CommandLine => "command_line",
            InputSource::Api => "api",
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a flag value held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Provenance {
    /// Set by the user
    Explicit {
        /// Input the value was read from
        source: InputSource,
    },
    /// Enabled by the resolver
    Derived {
        /// Every rule that enabled the flag in that pass, sorted
        rules: Vec<RuleId>,
        /// Pass number (1-based) in which the flag became enabled
        pass: usize,
    },
}

impl Provenance {
    pub fn is_explicit(&self) -> bool {
        matches!(self, Provenance::Explicit { .. })
    }
}

/// State and provenance of one flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub state: FlagState,
    pub provenance: Provenance,
}

/// Read access to flag enablement.
///
/// Rule antecedents and capability paths are evaluated through this trait so
/// the same predicate code runs against pass snapshots and the frozen result.
pub trait FlagView {
    /// Returns true if the flag is enabled.
    fn is_enabled(&self, flag: &FlagId) -> bool;
}
