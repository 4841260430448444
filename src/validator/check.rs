//! Consistency validator
//!
//! Runs once over the frozen result of a converged resolution:
//! - Superset constraints between flag families
//! - Mutually exclusive flag pairs
//! - Capabilities the user required
//!
//! The validator classifies; it never mutates.

use super::constraints::ConstraintSet;
use super::errors::{ValidationFailure, ValidationResult, Violation};
use crate::capability::CapabilityLayer;
use crate::flags::FrozenFlags;
use crate::observability::{log_event_with_fields, Event};

pub struct Validator<'a> {
    constraints: &'a ConstraintSet,
}

impl<'a> Validator<'a> {
    pub fn new(constraints: &'a ConstraintSet) -> Self {
        Self { constraints }
    }

    /// Checks every declared invariant and every requested capability.
    ///
    /// `capabilities` must be bound to `flags`.
    ///
    /// # Errors
    ///
    /// - `ValidatorError::Failed` carrying every violation, in check order
    /// - `ValidatorError::Capability` if a requested capability is unknown
    ///   or the layer is unbound
    pub fn check(
        &self,
        flags: &FrozenFlags,
        capabilities: &CapabilityLayer<'_>,
        requested: &[String],
    ) -> ValidationResult<()> {
        let mut violations = Vec::new();

        for constraint in self.constraints.supersets() {
            let missing = constraint.missing(flags.enabled(), flags);
            if !missing.is_empty() {
                violations.push(Violation::UnsupportedSubset {
                    constraint: constraint.name.clone(),
                    missing,
                });
            }
        }

        for exclusion in self.constraints.exclusions() {
            if exclusion.violated(flags) {
                violations.push(Violation::MutualExclusion {
                    a: exclusion.a.clone(),
                    b: exclusion.b.clone(),
                });
            }
        }

        for name in requested {
            let availability = capabilities.is_available(name)?;
            if !availability.available {
                violations.push(Violation::UnsatisfiableRequest {
                    capability: availability.capability,
                    paths: availability.unsatisfied,
                });
            }
        }

        let count = violations.len().to_string();
        match ValidationFailure::from_violations(violations) {
            None => {
                let constraints = self.constraints.len().to_string();
                let requested = requested.len().to_string();
                log_event_with_fields(
                    Event::ValidationPassed,
                    &[
                        ("constraints", constraints.as_str()),
                        ("requested", requested.as_str()),
                    ],
                );
                Ok(())
            }
            Some(failure) => {
                log_event_with_fields(
                    Event::ValidationFailed,
                    &[("violations", count.as_str()), ("primary", failure.primary().code())],
                );
                Err(failure.into())
            }
        }
    }
}
