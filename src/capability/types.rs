//! Capability type definitions
//!
//! A capability is available when at least one of its provider paths holds.
//! A provider path is a conjunction of flag literals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flags::{FlagId, FlagView};
use crate::rules::{Expr, Rule, RuleCategory, RuleId};

/// Kind of implementation behind a provider path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Software implementation compiled into the library
    Builtin,
    /// External accelerator or driver
    Driver,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Builtin => write!(f, "builtin"),
            ProviderKind::Driver => write!(f, "driver"),
        }
    }
}

/// One way to provide a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPath {
    pub name: String,
    pub kind: ProviderKind,
    /// Flags that must all be enabled
    pub requires: Vec<FlagId>,
    /// Flags that must all be off
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<FlagId>,
}

impl ProviderPath {
    pub fn new<I, F>(name: impl Into<String>, kind: ProviderKind, requires: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FlagId>,
    {
        Self {
            name: name.into(),
            kind,
            requires: requires.into_iter().map(Into::into).collect(),
            excludes: Vec::new(),
        }
    }

    /// Builtin path named "builtin"
    pub fn builtin<I, F>(requires: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FlagId>,
    {
        Self::new("builtin", ProviderKind::Builtin, requires)
    }

    /// Driver path named "driver"
    pub fn driver<I, F>(requires: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FlagId>,
    {
        Self::new("driver", ProviderKind::Driver, requires)
    }

    /// Adds flags that must be off for this path to hold
    pub fn excluding<I, F>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FlagId>,
    {
        self.excludes.extend(excludes.into_iter().map(Into::into));
        self
    }

    /// Returns true if every required flag is enabled and every excluded
    /// flag is not.
    pub fn holds(&self, view: &impl FlagView) -> bool {
        self.requires.iter().all(|f| view.is_enabled(f))
            && !self.excludes.iter().any(|f| view.is_enabled(f))
    }

    /// The path as a rule expression
    pub fn to_expr(&self) -> Expr {
        let required = self.requires.iter().cloned().map(Expr::Flag);
        let excluded = self
            .excludes
            .iter()
            .cloned()
            .map(|f| Expr::not(Expr::Flag(f)));
        Expr::all(required.chain(excluded))
    }
}

impl fmt::Display for ProviderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.kind, self.to_expr())
    }
}

/// A named "can do" predicate over provider paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub paths: Vec<ProviderPath>,
    /// Flag enabled through an internal-alias rule whenever the capability
    /// is available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promoted_to: Option<FlagId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, paths: Vec<ProviderPath>) -> Self {
        Self {
            name: name.into(),
            paths,
            promoted_to: None,
            description: String::new(),
        }
    }

    pub fn promoted_to(mut self, flag: impl Into<FlagId>) -> Self {
        self.promoted_to = Some(flag.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Rule writing the capability back as a flag, if promotion was requested
    pub fn promotion_rule(&self) -> Option<Rule> {
        let flag = self.promoted_to.as_ref()?;
        let antecedent = Expr::any(self.paths.iter().map(ProviderPath::to_expr));
        Some(
            Rule::new(
                RuleId::new(format!("capability.{}", self.name.to_ascii_lowercase())),
                antecedent,
                flag.clone(),
                RuleCategory::InternalAlias,
            )
            .with_rationale(format!("promotes capability {} to a flag", self.name)),
        )
    }
}

/// Availability of one capability against a resolved flag set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub capability: String,
    pub available: bool,
    /// Every path that holds. Choosing between them is left to runtime
    /// dispatch.
    pub satisfied_by: Vec<ProviderPath>,
    /// Paths that do not hold
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unsatisfied: Vec<ProviderPath>,
}

impl Availability {
    /// Names of satisfying paths
    pub fn satisfied_names(&self) -> Vec<&str> {
        self.satisfied_by.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FlagState, FlagStore, InputSource};

    fn view(enabled: &[&str]) -> crate::flags::FlagSnapshot {
        let mut store = FlagStore::new();
        for name in enabled {
            store
                .set(FlagId::from(*name), FlagState::Enabled, InputSource::Api)
                .unwrap();
        }
        store.snapshot()
    }

    #[test]
    fn test_path_holds_requires_all() {
        let path = ProviderPath::driver(["USE_PSA", "WANT_ECDH"]);
        assert!(path.holds(&view(&["USE_PSA", "WANT_ECDH"])));
        assert!(!path.holds(&view(&["USE_PSA"])));
    }

    #[test]
    fn test_path_excludes() {
        let path = ProviderPath::builtin(["ECDH_C"]).excluding(["USE_PSA"]);
        assert!(path.holds(&view(&["ECDH_C"])));
        assert!(!path.holds(&view(&["ECDH_C", "USE_PSA"])));
    }

    #[test]
    fn test_to_expr_matches_holds() {
        let path = ProviderPath::builtin(["A", "B"]).excluding(["C"]);
        for enabled in [&["A", "B"][..], &["A"][..], &["A", "B", "C"][..]] {
            let v = view(enabled);
            assert_eq!(path.to_expr().eval(&v), path.holds(&v));
        }
    }

    #[test]
    fn test_promotion_rule() {
        let cap = Capability::new(
            "CAN_ECDH",
            vec![ProviderPath::builtin(["ECDH_C"]), ProviderPath::driver(["ACCEL_ECDH"])],
        )
        .promoted_to("CAN_ECDH");
        let rule = cap.promotion_rule().unwrap();
        assert_eq!(rule.id.as_str(), "capability.can_ecdh");
        assert_eq!(rule.consequent, FlagId::from("CAN_ECDH"));
        assert_eq!(rule.category, RuleCategory::InternalAlias);
        assert!(rule.applies(&view(&["ACCEL_ECDH"])));

        let unpromoted = Capability::new("X", vec![ProviderPath::builtin(["X_C"])]);
        assert!(unpromoted.promotion_rule().is_none());
    }
}
