//! Capability layer error types

use thiserror::Error;

/// Result type for capability operations
pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// Queried before the resolver converged
    #[error("capability '{0}' queried before resolution converged")]
    NotResolved(String),

    #[error("unknown capability '{0}'")]
    UnknownCapability(String),

    #[error("capability '{0}' is already registered")]
    DuplicateCapability(String),

    #[error("capability '{0}' has no provider paths")]
    NoProviderPaths(String),

    #[error("provider path '{path}' of capability '{capability}' requires no flags")]
    EmptyProviderPath { capability: String, path: String },

    #[error("capability '{capability}' references invalid flag identifier '{flag}'")]
    InvalidIdentifier { capability: String, flag: String },

    #[error("capability name must not be empty")]
    EmptyName,
}
