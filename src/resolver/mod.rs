//! Resolver engine subsystem
//!
//! Applies a rule set to a flag store until no rule can enable anything
//! new. Snapshot-per-pass evaluation makes the result independent of rule
//! registration order.

mod engine;
mod errors;
mod state;

pub use engine::{CompatNotice, PassRecord, Resolved, Resolver, ResolverOptions};
pub use errors::{ResolveError, ResolveResult};
pub(crate) use errors::join_flags;
pub use state::{EngineState, FailureKind};
