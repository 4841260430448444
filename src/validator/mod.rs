//! Consistency validator subsystem
//!
//! Classifies a converged, frozen flag set against declared constraints.

mod check;
mod constraints;
mod errors;

pub use check::Validator;
pub use constraints::{ConstraintError, ConstraintSet, MutualExclusion, SupersetConstraint};
pub use errors::{ValidationFailure, ValidationResult, ValidatorError, Violation};
