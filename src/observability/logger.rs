//! Structured JSON logger
//!
//! One line per event on stderr: `event` first, `severity` second, then
//! the remaining fields in key order. Stdout belongs to command output.
//!
//! The minimum severity is process-wide and defaults to `Warn`, so a plain
//! run only reports legacy auto-enables and failures.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-flag derivation detail
    Trace = 0,
    /// Pass and scope boundaries
    Info = 1,
    /// Legacy auto-enables, rejected input
    Warn = 2,
    Error = 3,
    /// Resolution aborted by a table bug
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a case-insensitive level name, as found in config files and
    /// the environment
    pub fn parse(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Severity::Trace),
            "info" => Some(Severity::Info),
            "warn" | "warning" => Some(Severity::Warn),
            "error" => Some(Severity::Error),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }

    fn from_u8(value: u8) -> Self {
        [
            Severity::Trace,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
        ]
        .get(value as usize)
        .copied()
        .unwrap_or(Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Warn as u8);

/// Process-wide JSON-lines logger
pub struct Logger;

impl Logger {
    /// Lines below `severity` are dropped from now on.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Writes one event line if `severity` passes the filter
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if Self::enabled(severity) {
            let line = format_line(severity, event, fields);
            let mut stderr = io::stderr().lock();
            // A lost log line never fails a resolution
            let _ = stderr.write_all(line.as_bytes());
        }
    }
}

fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let mut line = format!(
        "{{\"event\":{},\"severity\":\"{}\"",
        quote(event),
        severity
    );
    for (key, value) in sorted {
        line.push(',');
        line.push_str(&quote(key));
        line.push(':');
        line.push_str(&quote(value));
    }
    line.push_str("}\n");
    line
}

fn quote(s: &str) -> String {
    // Serializing a str cannot fail
    serde_json::to_string(s).unwrap_or_default()
}
