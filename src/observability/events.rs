//! Observable resolution events
//!
//! Events are explicit and typed; log lines use their string form.

use std::fmt;

use super::logger::Severity;

/// Observable events during configuration resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Config file parsed and validated
    ConfigLoaded,
    /// Rule table built
    RuleTableLoaded,

    // Resolver
    /// Resolution started
    ResolveBegin,
    /// One resolver pass applied its batch
    PassComplete,
    /// A flag was enabled by a rule
    FlagDerived,
    /// A legacy-compat rule enabled a flag
    LegacyCompatAutoEnable,
    /// Fixed point reached
    ResolveConverged,
    /// A rule conflicted with explicit input (FATAL)
    ResolveConflict,
    /// Pass bound exceeded (FATAL)
    ResolveNonTermination,

    // Validator
    /// Validator found no violations
    ValidationPassed,
    /// Validator found violations
    ValidationFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RuleTableLoaded => "RULE_TABLE_LOADED",

            Event::ResolveBegin => "RESOLVE_BEGIN",
            Event::PassComplete => "PASS_COMPLETE",
            Event::FlagDerived => "FLAG_DERIVED",
            Event::LegacyCompatAutoEnable => "LEGACY_COMPAT_AUTO_ENABLE",
            Event::ResolveConverged => "RESOLVE_CONVERGED",
            Event::ResolveConflict => "RESOLVE_CONFLICT",
            Event::ResolveNonTermination => "RESOLVE_NON_TERMINATION",

            Event::ValidationPassed => "VALIDATION_PASSED",
            Event::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// Returns true if this event aborts a resolution
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Event::ResolveConflict | Event::ResolveNonTermination | Event::ValidationFailed
        )
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::PassComplete | Event::FlagDerived => Severity::Trace,
            Event::LegacyCompatAutoEnable => Severity::Warn,
            e if e.is_fatal() => Severity::Fatal,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
