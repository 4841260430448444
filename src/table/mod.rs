//! Versioned rule tables
//!
//! A table bundles everything a resolution needs besides user input:
//! - The rule set, including promotion rules generated from capabilities
//! - The capability registry
//! - Validator constraints
//!
//! The builtin table is compiled into the crate and built once per process.

mod builtin;

use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::capability::{CapabilityError, CapabilityRegistry};
use crate::rules::{RuleError, RuleSet};
use crate::validator::{ConstraintError, ConstraintSet};

/// Version of the builtin rule table. Bumped whenever a rule, capability or
/// constraint changes meaning.
pub const RULE_TABLE_VERSION: u32 = 1;

/// Result type for table construction
pub type TableResult<T> = Result<T, TableError>;

/// Table authoring errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("rule table: {0}")]
    Rule(#[from] RuleError),

    #[error("rule table: {0}")]
    Capability(#[from] CapabilityError),

    #[error("rule table: {0}")]
    Constraint(#[from] ConstraintError),
}

/// Immutable rule table shared by every resolution that uses it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTable {
    version: u32,
    rules: RuleSet,
    capabilities: CapabilityRegistry,
    constraints: ConstraintSet,
}

impl RuleTable {
    /// Assembles a table. Promotion rules for capabilities are appended to
    /// `rules`.
    ///
    /// # Errors
    ///
    /// `TableError::Rule` if a promotion rule collides with an existing rule
    /// id or is malformed.
    pub fn new(
        version: u32,
        mut rules: RuleSet,
        capabilities: CapabilityRegistry,
        constraints: ConstraintSet,
    ) -> TableResult<Self> {
        for rule in capabilities.promotion_rules() {
            rules.add_rule(rule)?;
        }
        Ok(Self {
            version,
            rules,
            capabilities,
            constraints,
        })
    }

    /// The builtin table at `RULE_TABLE_VERSION`.
    ///
    /// # Errors
    ///
    /// Only if the compiled-in table itself is malformed, which the test
    /// suite rules out.
    pub fn builtin() -> TableResult<&'static RuleTable> {
        static BUILTIN: OnceLock<TableResult<RuleTable>> = OnceLock::new();
        BUILTIN
            .get_or_init(builtin::build)
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, ProviderPath};
    use crate::rules::{Expr, RuleCategory, RuleId};

    #[test]
    fn test_new_appends_promotion_rules() {
        let mut rules = RuleSet::new();
        rules
            .add("a_to_b", Expr::flag("A"), "B", RuleCategory::HardDependency)
            .unwrap();
        let mut capabilities = CapabilityRegistry::new();
        capabilities
            .register(
                Capability::new("CAN_X", vec![ProviderPath::builtin(["X_C"])]).promoted_to("CAN_X"),
            )
            .unwrap();

        let table = RuleTable::new(7, rules, capabilities, ConstraintSet::new()).unwrap();
        assert_eq!(table.version(), 7);
        assert_eq!(table.rules().len(), 2);
        assert!(table.rules().get(&RuleId::from("capability.can_x")).is_some());
    }

    #[test]
    fn test_new_rejects_colliding_promotion_rule() {
        let mut rules = RuleSet::new();
        rules
            .add("capability.can_x", Expr::flag("A"), "B", RuleCategory::HardDependency)
            .unwrap();
        let mut capabilities = CapabilityRegistry::new();
        capabilities
            .register(
                Capability::new("CAN_X", vec![ProviderPath::builtin(["X_C"])]).promoted_to("CAN_X"),
            )
            .unwrap();

        let err = RuleTable::new(1, rules, capabilities, ConstraintSet::new()).unwrap_err();
        assert_eq!(
            err,
            TableError::Rule(RuleError::DuplicateRule(RuleId::from("capability.can_x")))
        );
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = RuleTable::builtin().unwrap();
        let b = RuleTable::builtin().unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.version(), RULE_TABLE_VERSION);
    }
}
