//! Rule set: an unordered collection of implication rules
//!
//! Registration order carries no meaning. The resolver evaluates every
//! rule against the same snapshot, so any permutation of the same rules
//! produces the same fixed point.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Expr, Rule, RuleCategory, RuleId};
use crate::flags::FlagId;

/// Result type for rule set construction
pub type RuleResult<T> = Result<T, RuleError>;

/// Rule authoring errors, reported while the table is built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("duplicate rule id '{0}'")]
    DuplicateRule(RuleId),

    #[error("rule '{rule}' enables {flag} but its antecedent requires {flag} to be off")]
    SelfContradiction { rule: RuleId, flag: FlagId },

    #[error("rule '{rule}' references invalid flag identifier '{flag}'")]
    InvalidIdentifier { rule: RuleId, flag: String },

    #[error("rule id must not be empty")]
    EmptyRuleId,
}

/// Immutable-once-built collection of rules.
///
/// `RuleSet` is `Send + Sync`; concurrent resolutions share one instance by
/// reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Rule>", into = "Vec<Rule>")]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule.
    ///
    /// # Errors
    ///
    /// - `EmptyRuleId` / `DuplicateRule` for id problems
    /// - `InvalidIdentifier` if any referenced flag is malformed
    /// - `SelfContradiction` if the consequent appears negated in the antecedent
    pub fn add_rule(&mut self, rule: Rule) -> RuleResult<()> {
        if rule.id.as_str().is_empty() {
            return Err(RuleError::EmptyRuleId);
        }
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(RuleError::DuplicateRule(rule.id));
        }

        let referenced = rule
            .antecedent
            .flags()
            .into_iter()
            .chain(std::iter::once(rule.consequent.clone()));
        for flag in referenced {
            if !flag.is_valid() {
                return Err(RuleError::InvalidIdentifier {
                    rule: rule.id,
                    flag: flag.as_str().to_string(),
                });
            }
        }

        if rule.is_self_contradicting() {
            return Err(RuleError::SelfContradiction {
                flag: rule.consequent,
                rule: rule.id,
            });
        }

        self.rules.push(rule);
        Ok(())
    }

    /// Convenience wrapper around `add_rule`.
    pub fn add(
        &mut self,
        id: impl Into<RuleId>,
        antecedent: Expr,
        consequent: impl Into<FlagId>,
        category: RuleCategory,
    ) -> RuleResult<()> {
        self.add_rule(Rule::new(id, antecedent, consequent, category))
    }

    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules grouped by the flag they enable
    pub fn by_consequent(&self) -> BTreeMap<&FlagId, Vec<&Rule>> {
        let mut map: BTreeMap<&FlagId, Vec<&Rule>> = BTreeMap::new();
        for rule in &self.rules {
            map.entry(&rule.consequent).or_default().push(rule);
        }
        map
    }

    /// Flags only ever enabled through internal-alias rules
    pub fn internal_flags(&self) -> BTreeSet<FlagId> {
        self.by_consequent()
            .into_iter()
            .filter(|(_, rules)| rules.iter().all(|r| r.category == RuleCategory::InternalAlias))
            .map(|(flag, _)| flag.clone())
            .collect()
    }
}

impl TryFrom<Vec<Rule>> for RuleSet {
    type Error = RuleError;

    fn try_from(rules: Vec<Rule>) -> RuleResult<Self> {
        let mut set = RuleSet::new();
        for rule in rules {
            set.add_rule(rule)?;
        }
        Ok(set)
    }
}

impl From<RuleSet> for Vec<Rule> {
    fn from(set: RuleSet) -> Self {
        set.rules
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut set = RuleSet::new();
        set.add("a_to_b", Expr::flag("A"), "B", RuleCategory::HardDependency)
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(&RuleId::from("a_to_b")).map(|r| r.consequent.as_str()),
            Some("B")
        );
    }

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut set = RuleSet::new();
        set.add("r", Expr::flag("A"), "B", RuleCategory::HardDependency)
            .unwrap();
        let err = set
            .add("r", Expr::flag("C"), "D", RuleCategory::HardDependency)
            .unwrap_err();
        assert_eq!(err, RuleError::DuplicateRule(RuleId::from("r")));
    }

    #[test]
    fn test_self_contradiction_rejected() {
        let mut set = RuleSet::new();
        let err = set
            .add(
                "bad",
                Expr::not(Expr::flag("F")),
                "F",
                RuleCategory::HardDependency,
            )
            .unwrap_err();
        assert!(matches!(err, RuleError::SelfContradiction { .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let mut set = RuleSet::new();
        let err = set
            .add("r", Expr::flag("OK"), "not-ok", RuleCategory::HardDependency)
            .unwrap_err();
        assert_eq!(
            err,
            RuleError::InvalidIdentifier {
                rule: RuleId::from("r"),
                flag: "not-ok".into()
            }
        );
    }

    #[test]
    fn test_internal_flags_require_all_alias_rules() {
        let mut set = RuleSet::new();
        set.add("a", Expr::flag("X"), "ALIAS", RuleCategory::InternalAlias)
            .unwrap();
        set.add("b", Expr::flag("Y"), "MIXED", RuleCategory::InternalAlias)
            .unwrap();
        set.add("c", Expr::flag("Z"), "MIXED", RuleCategory::LegacyCompat)
            .unwrap();
        let internal = set.internal_flags();
        assert!(internal.contains(&FlagId::from("ALIAS")));
        assert!(!internal.contains(&FlagId::from("MIXED")));
    }

    #[test]
    fn test_deserialize_validates_rules() {
        let json = r#"[
            {"id": "r", "antecedent": {"flag": "A"}, "consequent": "B", "category": "hard_dependency"},
            {"id": "r", "antecedent": {"flag": "C"}, "consequent": "D", "category": "hard_dependency"}
        ]"#;
        let err = serde_json::from_str::<RuleSet>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate rule id 'r'"));

        let json = r#"[{"id": "r", "antecedent": {"flag": "A"}, "consequent": "B", "category": "legacy_compat"}]"#;
        let set: RuleSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(serde_json::to_value(&set).unwrap()[0]["id"], "r");
    }

    #[test]
    fn test_rule_set_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleSet>();
    }
}
