//! Resolver engine state machine
//!
//! ```text
//! Idle -> Iterating -> Converged
//!                   -> Failed(Conflict)
//!                   -> Failed(NonTermination)
//! ```
//!
//! Converged and Failed are terminal.

use std::fmt;

/// Failure classification for a terminal `Failed` state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Conflict,
    NonTermination,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Conflict => write!(f, "Conflict"),
            FailureKind::NonTermination => write!(f, "NonTermination"),
        }
    }
}

/// Resolver engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No pass has run
    Idle,
    /// `pass` passes have completed and the last one changed the store
    Iterating { pass: usize },
    /// Fixed point reached after `passes` passes (the last one empty)
    Converged { passes: usize },
    /// Resolution aborted
    Failed(FailureKind),
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Converged { .. } | EngineState::Failed(_))
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, EngineState::Converged { .. })
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "Idle"),
            EngineState::Iterating { pass } => write!(f, "Iterating(pass {})", pass),
            EngineState::Converged { passes } => write!(f, "Converged({} passes)", passes),
            EngineState::Failed(kind) => write!(f, "Failed({})", kind),
        }
    }
}
