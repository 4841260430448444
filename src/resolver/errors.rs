//! Resolver error types

use thiserror::Error;

use crate::flags::{Conflict, FlagId};

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Fatal resolver outcomes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A derived enable contradicts explicit input or an earlier derivation.
    /// `pass` is 0 when the conflict is in the input itself.
    #[error("conflict in pass {pass}: {conflict}")]
    Conflict { conflict: Conflict, pass: usize },

    /// The pass bound was exceeded. Indicates a broken rule table.
    #[error("no fixed point after {passes} passes; still changing: {}", join_flags(.still_changing))]
    NonTermination {
        passes: usize,
        still_changing: Vec<FlagId>,
    },
}

impl ResolveError {
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            ResolveError::Conflict { conflict, .. } => Some(conflict),
            ResolveError::NonTermination { .. } => None,
        }
    }
}

pub(crate) fn join_flags(flags: &[FlagId]) -> String {
    flags
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
