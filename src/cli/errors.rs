//! CLI-specific error types
//!
//! All CLI errors exit with status 1. Resolution failures keep the
//! resolution error code so tooling sees `CFG_CONFLICT` and friends
//! rather than a generic CLI code.

use std::fmt;
use std::io;

use serde_json::{json, Value};

use crate::resolution::{ResolutionError, ResolutionErrorKind};

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Resolution failed
    Resolution(ResolutionErrorKind),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CFG_CLI_CONFIG_ERROR",
            Self::IoError => "CFG_CLI_IO_ERROR",
            Self::Resolution(kind) => kind.code(),
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    details: Value,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured diagnostics, `null` when there are none
    pub fn details(&self) -> &Value {
        &self.details
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ResolutionError> for CliError {
    fn from(e: ResolutionError) -> Self {
        let details = match e.violations() {
            [] => json!({ "table_bug": e.is_table_bug() }),
            violations => json!({
                "table_bug": e.is_table_bug(),
                "violations": violations,
            }),
        };
        Self {
            code: CliErrorCode::Resolution(e.kind()),
            message: e.to_string(),
            details,
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
