//! Declared invariants over a resolved flag set

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flags::{FlagId, FlagView};

/// Constraint authoring errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("superset constraint '{0}' has an empty family prefix")]
    EmptyPrefix(String),

    #[error("superset constraint '{0}' names no supported families")]
    NoSupportedFamilies(String),

    #[error("duplicate constraint '{0}'")]
    Duplicate(String),

    #[error("mutual exclusion pairs {0} with itself")]
    SelfExclusion(FlagId),

    #[error("constraint references invalid flag identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Every enabled member of the required family must have a counterpart,
/// matched by suffix, enabled in at least one supported family.
///
/// With `required_prefix = "MBEDTLS_PSA_WANT_"` and
/// `supported_prefixes = ["MBEDTLS_PSA_ACCEL_", "MBEDTLS_PSA_BUILTIN_"]`,
/// enabling `MBEDTLS_PSA_WANT_ALG_X` requires `MBEDTLS_PSA_ACCEL_ALG_X` or
/// `MBEDTLS_PSA_BUILTIN_ALG_X`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersetConstraint {
    pub name: String,
    pub required_prefix: String,
    pub supported_prefixes: Vec<String>,
}

impl SupersetConstraint {
    pub fn new<I, S>(name: impl Into<String>, required_prefix: impl Into<String>, supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            required_prefix: required_prefix.into(),
            supported_prefixes: supported.into_iter().map(Into::into).collect(),
        }
    }

    /// Required-family members that have no supported counterpart.
    pub fn missing<'f>(
        &self,
        enabled: impl IntoIterator<Item = &'f FlagId>,
        view: &impl FlagView,
    ) -> Vec<FlagId> {
        enabled
            .into_iter()
            .filter_map(|flag| {
                let suffix = flag.as_str().strip_prefix(self.required_prefix.as_str())?;
                let supported = self
                    .supported_prefixes
                    .iter()
                    .any(|prefix| view.is_enabled(&FlagId::new(format!("{prefix}{suffix}"))));
                (!supported).then(|| flag.clone())
            })
            .collect()
    }
}

/// Two flags that must never both be enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutualExclusion {
    pub a: FlagId,
    pub b: FlagId,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

impl MutualExclusion {
    pub fn new(a: impl Into<FlagId>, b: impl Into<FlagId>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            rationale: String::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn violated(&self, view: &impl FlagView) -> bool {
        view.is_enabled(&self.a) && view.is_enabled(&self.b)
    }
}

/// Immutable-once-built set of validator constraints
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintSet {
    supersets: Vec<SupersetConstraint>,
    exclusions: Vec<MutualExclusion>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_superset(&mut self, constraint: SupersetConstraint) -> Result<(), ConstraintError> {
        if constraint.required_prefix.is_empty()
            || constraint.supported_prefixes.iter().any(String::is_empty)
        {
            return Err(ConstraintError::EmptyPrefix(constraint.name));
        }
        if constraint.supported_prefixes.is_empty() {
            return Err(ConstraintError::NoSupportedFamilies(constraint.name));
        }
        if self.supersets.iter().any(|c| c.name == constraint.name) {
            return Err(ConstraintError::Duplicate(constraint.name));
        }
        self.supersets.push(constraint);
        Ok(())
    }

    pub fn add_exclusion(&mut self, exclusion: MutualExclusion) -> Result<(), ConstraintError> {
        for flag in [&exclusion.a, &exclusion.b] {
            if !flag.is_valid() {
                return Err(ConstraintError::InvalidIdentifier(flag.as_str().to_string()));
            }
        }
        if exclusion.a == exclusion.b {
            return Err(ConstraintError::SelfExclusion(exclusion.a));
        }
        let same_pair = |e: &MutualExclusion| {
            (e.a == exclusion.a && e.b == exclusion.b) || (e.a == exclusion.b && e.b == exclusion.a)
        };
        if self.exclusions.iter().any(same_pair) {
            return Err(ConstraintError::Duplicate(format!(
                "{} / {}",
                exclusion.a, exclusion.b
            )));
        }
        self.exclusions.push(exclusion);
        Ok(())
    }

    pub fn supersets(&self) -> &[SupersetConstraint] {
        &self.supersets
    }

    pub fn exclusions(&self) -> &[MutualExclusion] {
        &self.exclusions
    }

    pub fn len(&self) -> usize {
        self.supersets.len() + self.exclusions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
