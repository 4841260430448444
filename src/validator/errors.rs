//! Validator error types
//!
//! A failed validation keeps every violation found. The first one, in
//! check order (subset, exclusion, request), is the primary kind.

use serde::Serialize;
use thiserror::Error;

use crate::capability::{CapabilityError, ProviderPath};
use crate::flags::FlagId;
use crate::resolver::join_flags;

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidatorError>;

/// One broken invariant in a frozen flag set
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("constraint '{constraint}': no supported counterpart for {}", join_flags(.missing))]
    UnsupportedSubset {
        constraint: String,
        missing: Vec<FlagId>,
    },

    #[error("{a} and {b} must not both be enabled")]
    MutualExclusion { a: FlagId, b: FlagId },

    #[error("requested capability '{capability}' is unavailable; unsatisfied paths: {}", describe_paths(.paths))]
    UnsatisfiableRequest {
        capability: String,
        paths: Vec<ProviderPath>,
    },
}

impl Violation {
    pub fn code(&self) -> &'static str {
        match self {
            Violation::UnsupportedSubset { .. } => "CFG_UNSUPPORTED_SUBSET",
            Violation::MutualExclusion { .. } => "CFG_MUTUAL_EXCLUSION",
            Violation::UnsatisfiableRequest { .. } => "CFG_UNSATISFIABLE_REQUEST",
        }
    }
}

/// All violations of one validation run, never empty
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{}", .violations.first().map(ToString::to_string).unwrap_or_default())]
pub struct ValidationFailure {
    violations: Vec<Violation>,
}

impl ValidationFailure {
    /// Returns `None` for an empty list.
    pub(crate) fn from_violations(violations: Vec<Violation>) -> Option<Self> {
        (!violations.is_empty()).then_some(Self { violations })
    }

    /// The violation that classifies this failure
    pub fn primary(&self) -> &Violation {
        &self.violations[0]
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    Failed(#[from] ValidationFailure),

    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

fn describe_paths(paths: &[ProviderPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
