//! Resolution error types
//!
//! Error codes:
//! - CFG_INVALID_INPUT (REJECT)
//! - CFG_UNKNOWN_CAPABILITY (REJECT)
//! - CFG_NOT_RESOLVED (FATAL)
//! - CFG_CONFLICT (FATAL)
//! - CFG_NON_TERMINATION (FATAL, table bug)
//! - CFG_UNSUPPORTED_SUBSET (FATAL)
//! - CFG_MUTUAL_EXCLUSION (FATAL)
//! - CFG_UNSATISFIABLE_REQUEST (FATAL)
//! - CFG_TABLE_INVALID (FATAL, table bug)

use std::fmt;

use thiserror::Error;

use crate::capability::CapabilityError;
use crate::flags::{Conflict, FlagError, FlagId};
use crate::resolver::{join_flags, ResolveError};
use crate::table::TableError;
use crate::validator::{ValidationFailure, ValidatorError, Violation};

/// Result type for a full resolution
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Severity levels for resolution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input was rejected before resolution started
    Reject,
    /// The build cannot proceed with this configuration
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Primary classification of a resolution failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    InvalidInput,
    UnknownCapability,
    NotResolved,
    Conflict,
    NonTermination,
    UnsupportedSubset,
    MutualExclusion,
    UnsatisfiableRequest,
    TableInvalid,
}

impl ResolutionErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ResolutionErrorKind::InvalidInput => "CFG_INVALID_INPUT",
            ResolutionErrorKind::UnknownCapability => "CFG_UNKNOWN_CAPABILITY",
            ResolutionErrorKind::NotResolved => "CFG_NOT_RESOLVED",
            ResolutionErrorKind::Conflict => "CFG_CONFLICT",
            ResolutionErrorKind::NonTermination => "CFG_NON_TERMINATION",
            ResolutionErrorKind::UnsupportedSubset => "CFG_UNSUPPORTED_SUBSET",
            ResolutionErrorKind::MutualExclusion => "CFG_MUTUAL_EXCLUSION",
            ResolutionErrorKind::UnsatisfiableRequest => "CFG_UNSATISFIABLE_REQUEST",
            ResolutionErrorKind::TableInvalid => "CFG_TABLE_INVALID",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ResolutionErrorKind::InvalidInput | ResolutionErrorKind::UnknownCapability => {
                Severity::Reject
            }
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Every way a resolution can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `pass` is 0 when the input itself is contradictory
    #[error("conflict in pass {pass}: {conflict}")]
    Conflict { conflict: Conflict, pass: usize },

    #[error("no fixed point after {passes} passes; still changing: {}", join_flags(.still_changing))]
    NonTermination {
        passes: usize,
        still_changing: Vec<FlagId>,
    },

    #[error("validation failed: {0}")]
    Validation(ValidationFailure),

    #[error(transparent)]
    Capability(CapabilityError),

    #[error(transparent)]
    Table(#[from] TableError),
}

impl ResolutionError {
    pub fn kind(&self) -> ResolutionErrorKind {
        match self {
            ResolutionError::InvalidInput(_) => ResolutionErrorKind::InvalidInput,
            ResolutionError::Conflict { .. } => ResolutionErrorKind::Conflict,
            ResolutionError::NonTermination { .. } => ResolutionErrorKind::NonTermination,
            ResolutionError::Validation(failure) => match failure.primary() {
                Violation::UnsupportedSubset { .. } => ResolutionErrorKind::UnsupportedSubset,
                Violation::MutualExclusion { .. } => ResolutionErrorKind::MutualExclusion,
                Violation::UnsatisfiableRequest { .. } => {
                    ResolutionErrorKind::UnsatisfiableRequest
                }
            },
            ResolutionError::Capability(CapabilityError::NotResolved(_)) => {
                ResolutionErrorKind::NotResolved
            }
            ResolutionError::Capability(CapabilityError::UnknownCapability(_)) => {
                ResolutionErrorKind::UnknownCapability
            }
            ResolutionError::Capability(_) | ResolutionError::Table(_) => {
                ResolutionErrorKind::TableInvalid
            }
        }
    }

    /// Stable string code
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn severity(&self) -> Severity {
        self.kind().severity()
    }

    /// True when the failure points at the rule table rather than the input
    pub fn is_table_bug(&self) -> bool {
        matches!(
            self.kind(),
            ResolutionErrorKind::NonTermination | ResolutionErrorKind::TableInvalid
        )
    }

    /// Every validator violation, empty for other kinds
    pub fn violations(&self) -> &[Violation] {
        match self {
            ResolutionError::Validation(failure) => failure.violations(),
            _ => &[],
        }
    }
}

impl From<FlagError> for ResolutionError {
    fn from(err: FlagError) -> Self {
        match err {
            FlagError::Conflict(conflict) => ResolutionError::Conflict { conflict, pass: 0 },
            FlagError::InvalidIdentifier(name) => {
                ResolutionError::InvalidInput(format!("invalid flag identifier '{}'", name))
            }
        }
    }
}

impl From<ResolveError> for ResolutionError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Conflict { conflict, pass } => ResolutionError::Conflict { conflict, pass },
            ResolveError::NonTermination {
                passes,
                still_changing,
            } => ResolutionError::NonTermination {
                passes,
                still_changing,
            },
        }
    }
}

impl From<ValidatorError> for ResolutionError {
    fn from(err: ValidatorError) -> Self {
        match err {
            ValidatorError::Failed(failure) => ResolutionError::Validation(failure),
            ValidatorError::Capability(err) => ResolutionError::Capability(err),
        }
    }
}

impl From<CapabilityError> for ResolutionError {
    fn from(err: CapabilityError) -> Self {
        ResolutionError::Capability(err)
    }
}
