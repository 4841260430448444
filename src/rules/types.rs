//! Rule type definitions
//!
//! A rule is a pure implication: when its antecedent holds over a flag
//! snapshot, its consequent flag must be enabled. Rules never disable flags.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::flags::{FlagId, FlagView};

/// Unique identifier of a rule within a rule set
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RuleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Why a rule exists. Drives how its auto-enables are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    /// The consequent is required for the antecedent to build
    HardDependency,
    /// Preserves behavior of configurations written for earlier releases.
    /// Every auto-enable is reported as a notice.
    LegacyCompat,
    /// Enables an implementation-detail flag that is not part of the
    /// public resolved contract
    InternalAlias,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::HardDependency => "hard_dependency",
            RuleCategory::LegacyCompat => "legacy_compat",
            RuleCategory::InternalAlias => "internal_alias",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean expression over flag-enabled tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// True if the flag is enabled
    Flag(FlagId),
    /// True if the inner expression is false
    Not(Box<Expr>),
    /// True if every operand is true (true when empty)
    All(Vec<Expr>),
    /// True if any operand is true (false when empty)
    Any(Vec<Expr>),
}

impl Expr {
    pub fn flag(name: impl Into<FlagId>) -> Self {
        Expr::Flag(name.into())
    }

    pub fn not(inner: Expr) -> Self {
        Expr::Not(Box::new(inner))
    }

    pub fn all(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::All(operands.into_iter().collect())
    }

    pub fn any(operands: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Any(operands.into_iter().collect())
    }

    /// Conjunction of plain flag tests
    pub fn all_of<I, F>(flags: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FlagId>,
    {
        Expr::All(flags.into_iter().map(|f| Expr::Flag(f.into())).collect())
    }

    /// Disjunction of plain flag tests
    pub fn any_of<I, F>(flags: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FlagId>,
    {
        Expr::Any(flags.into_iter().map(|f| Expr::Flag(f.into())).collect())
    }

    /// Evaluates the expression against a flag view.
    pub fn eval(&self, view: &impl FlagView) -> bool {
        match self {
            Expr::Flag(flag) => view.is_enabled(flag),
            Expr::Not(inner) => !inner.eval(view),
            Expr::All(operands) => operands.iter().all(|e| e.eval(view)),
            Expr::Any(operands) => operands.iter().any(|e| e.eval(view)),
        }
    }

    /// Every flag referenced anywhere in the expression.
    pub fn flags(&self) -> BTreeSet<FlagId> {
        let mut out = BTreeSet::new();
        self.collect(true, &mut |flag, _| {
            out.insert(flag.clone());
        });
        out
    }

    /// Flags whose absence the expression can depend on: those that occur
    /// under an odd number of negations.
    pub fn negated_flags(&self) -> BTreeSet<FlagId> {
        let mut out = BTreeSet::new();
        self.collect(true, &mut |flag, positive| {
            if !positive {
                out.insert(flag.clone());
            }
        });
        out
    }

    fn collect(&self, positive: bool, visit: &mut impl FnMut(&FlagId, bool)) {
        match self {
            Expr::Flag(flag) => visit(flag, positive),
            Expr::Not(inner) => inner.collect(!positive, visit),
            Expr::All(operands) | Expr::Any(operands) => {
                for operand in operands {
                    operand.collect(positive, visit);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, operands: &[Expr], op: &str, empty: &str) -> fmt::Result {
            if operands.is_empty() {
                return f.write_str(empty);
            }
            f.write_str("(")?;
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", operand)?;
            }
            f.write_str(")")
        }

        match self {
            Expr::Flag(flag) => write!(f, "{}", flag),
            Expr::Not(inner) => write!(f, "!{}", inner),
            Expr::All(operands) => join(f, operands, "&&", "true"),
            Expr::Any(operands) => join(f, operands, "||", "false"),
        }
    }
}

/// Declarative implication from a flag expression to one enabled flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub antecedent: Expr,
    pub consequent: FlagId,
    pub category: RuleCategory,
    /// Human-readable reason, surfaced in notices
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

impl Rule {
    pub fn new(
        id: impl Into<RuleId>,
        antecedent: Expr,
        consequent: impl Into<FlagId>,
        category: RuleCategory,
    ) -> Self {
        Self {
            id: id.into(),
            antecedent,
            consequent: consequent.into(),
            category,
            rationale: String::new(),
        }
    }

    /// Attaches a rationale
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Returns true if the antecedent holds for the given view.
    pub fn applies(&self, view: &impl FlagView) -> bool {
        self.antecedent.eval(view)
    }

    /// A rule is self-contradicting when its consequent appears negated in
    /// its own antecedent: firing would falsify the reason it fired.
    pub fn is_self_contradicting(&self) -> bool {
        self.antecedent.negated_flags().contains(&self.consequent)
    }
}
