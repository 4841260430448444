//! Flag store subsystem
//!
//! Maps flag identifiers to tri-state values. Only the resolver may
//! derive new values; explicit user disables are never overridden.

mod errors;
mod store;
mod types;

pub use errors::{Conflict, FlagError, FlagResult};
pub(crate) use errors::join_ids;
pub use store::{FlagSnapshot, FlagStore, FrozenFlags};
pub use types::{FlagEntry, FlagId, FlagState, FlagView, InputSource, Provenance};
