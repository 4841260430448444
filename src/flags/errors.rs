//! Flag store error types

use thiserror::Error;

use super::types::{FlagId, FlagState, InputSource};
use crate::rules::RuleId;

/// Result type for flag store operations
pub type FlagResult<T> = Result<T, FlagError>;

/// A flag was driven to two incompatible states.
///
/// Conflicts are never resolved in favor of the rules: explicit user intent
/// always wins and the resolution aborts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    /// The user gave the same flag two different explicit values
    #[error("flag {flag} is {existing} from {existing_origin} but {requested} was requested from {origin}")]
    ContradictoryInput {
        flag: FlagId,
        existing: FlagState,
        existing_origin: InputSource,
        requested: FlagState,
        origin: InputSource,
    },

    /// A rule tried to enable a flag the user explicitly disabled
    #[error("flag {flag} is explicitly disabled ({origin}) but required by rule(s) {}", join_ids(.rules))]
    ExplicitlyDisabled {
        flag: FlagId,
        rules: Vec<RuleId>,
        origin: InputSource,
    },

    /// A rule fired because `flag` was not enabled, then other rules enabled it
    #[error("rule {rule} fired while {flag} was not enabled, but rule(s) {} later enabled {flag}", join_ids(.enabled_by))]
    NegatedDependency {
        flag: FlagId,
        rule: RuleId,
        enabled_by: Vec<RuleId>,
    },
}

impl Conflict {
    /// Returns the flag at the center of the conflict
    pub fn flag(&self) -> &FlagId {
        match self {
            Conflict::ContradictoryInput { flag, .. }
            | Conflict::ExplicitlyDisabled { flag, .. }
            | Conflict::NegatedDependency { flag, .. } => flag,
        }
    }

    /// Returns every rule involved in the conflict
    pub fn rules(&self) -> Vec<RuleId> {
        match self {
            Conflict::ContradictoryInput { .. } => Vec::new(),
            Conflict::ExplicitlyDisabled { rules, .. } => rules.clone(),
            Conflict::NegatedDependency {
                rule, enabled_by, ..
            } => {
                let mut all = vec![rule.clone()];
                all.extend(enabled_by.iter().cloned());
                all
            }
        }
    }
}

/// Flag store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    #[error("conflict: {0}")]
    Conflict(#[from] Conflict),

    #[error("invalid flag identifier '{0}'")]
    InvalidIdentifier(String),
}

pub(crate) fn join_ids(ids: &[RuleId]) -> String {
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
