//! Capability abstraction layer
//!
//! Code that needs an operation asks for a capability, not for the flags
//! that happen to provide it:
//! - A capability holds if any of its provider paths holds
//! - A provider path is a conjunction of required and excluded flags
//! - Capabilities may be promoted back into the flag store as derived flags
//!
//! Queries are only answered against a converged, frozen flag set.

mod errors;
mod registry;
mod types;

pub use errors::{CapabilityError, CapabilityResult};
pub use registry::{CapabilityLayer, CapabilityRegistry};
pub use types::{Availability, Capability, ProviderKind, ProviderPath};
