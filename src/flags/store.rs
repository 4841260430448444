//! Flag store: the substrate every other component reads
//!
//! Lifecycle:
//! - Created empty, populated from user input via `set`
//! - Mutated only by the resolver through `enable_derived`
//! - Consumed by `freeze` once the resolver converges
//!
//! `FrozenFlags` has no mutators, so a converged result can never be
//! modified after it is handed to the validator.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::errors::{Conflict, FlagError, FlagResult};
use super::types::{FlagEntry, FlagId, FlagState, FlagView, InputSource, Provenance};
use crate::rules::RuleId;

/// Mutable flag store owned by a single resolution run
#[derive(Debug, Clone, Default)]
pub struct FlagStore {
    entries: BTreeMap<FlagId, FlagEntry>,
}

impl FlagStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the explicit state of a flag.
    ///
    /// Setting the same value twice is a no-op. Setting `Unset` on a flag
    /// that was never touched is a no-op.
    ///
    /// # Errors
    ///
    /// - `InvalidIdentifier` if the flag name is malformed
    /// - `Conflict::ContradictoryInput` if the flag already holds a different
    ///   explicit value
    /// - `Conflict::ExplicitlyDisabled` if a rule already enabled the flag
    ///   and the user now disables it
    pub fn set(&mut self, flag: FlagId, state: FlagState, source: InputSource) -> FlagResult<()> {
        if !flag.is_valid() {
            return Err(FlagError::InvalidIdentifier(flag.as_str().to_string()));
        }

        let Some(existing) = self.entries.get_mut(&flag) else {
            if state != FlagState::Unset {
                self.entries.insert(
                    flag,
                    FlagEntry {
                        state,
                        provenance: Provenance::Explicit { source },
                    },
                );
            }
            return Ok(());
        };

        match existing.provenance.clone() {
            Provenance::Explicit { source: existing_source } => {
                if existing.state == state {
                    return Ok(());
                }
                Err(Conflict::ContradictoryInput {
                    flag,
                    existing: existing.state,
                    existing_origin: existing_source,
                    requested: state,
                    origin: source,
                }
                .into())
            }
            Provenance::Derived { rules, .. } => match state {
                FlagState::Enabled => {
                    existing.provenance = Provenance::Explicit { source };
                    Ok(())
                }
                FlagState::Disabled | FlagState::Unset => Err(Conflict::ExplicitlyDisabled {
                    flag,
                    rules,
                    origin: source,
                }
                .into()),
            },
        }
    }

    /// Returns the state of a flag, `Unset` if never touched.
    pub fn get(&self, flag: &FlagId) -> FlagState {
        self.entries
            .get(flag)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Returns the provenance of a touched flag.
    pub fn provenance(&self, flag: &FlagId) -> Option<&Provenance> {
        self.entries.get(flag).map(|entry| &entry.provenance)
    }

    /// Enables a flag on behalf of one or more rules.
    ///
    /// Returns true if the flag changed, false if it was already enabled.
    /// Only the resolver calls this.
    pub(crate) fn enable_derived(
        &mut self,
        flag: &FlagId,
        rules: &[RuleId],
        pass: usize,
    ) -> Result<bool, Conflict> {
        match self.entries.get(flag) {
            Some(entry) if entry.state == FlagState::Enabled => Ok(false),
            Some(FlagEntry {
                state: FlagState::Disabled,
                provenance: Provenance::Explicit { source },
            }) => Err(Conflict::ExplicitlyDisabled {
                flag: flag.clone(),
                rules: rules.to_vec(),
                origin: *source,
            }),
            _ => {
                self.entries.insert(
                    flag.clone(),
                    FlagEntry {
                        state: FlagState::Enabled,
                        provenance: Provenance::Derived {
                            rules: rules.to_vec(),
                            pass,
                        },
                    },
                );
                Ok(true)
            }
        }
    }

    /// Iterates enabled flags in identifier order.
    pub fn enabled(&self) -> impl Iterator<Item = &FlagId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state == FlagState::Enabled)
            .map(|(flag, _)| flag)
    }

    /// Number of touched flags
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes an immutable snapshot of the enabled set.
    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            enabled: self.enabled().cloned().collect(),
        }
    }

    /// Freezes the store. The returned value cannot be mutated.
    ///
    /// Only a converged resolver freezes its store, so holding a
    /// `FrozenFlags` proves resolution finished.
    pub(crate) fn freeze(self) -> FrozenFlags {
        FrozenFlags {
            entries: self.entries,
        }
    }
}

/// Enabled set as of one completed resolver pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlagSnapshot {
    enabled: BTreeSet<FlagId>,
}

impl FlagSnapshot {
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagId> {
        self.enabled.iter()
    }
}

impl FlagView for FlagSnapshot {
    fn is_enabled(&self, flag: &FlagId) -> bool {
        self.enabled.contains(flag)
    }
}

/// Final flag state of a converged resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FrozenFlags {
    entries: BTreeMap<FlagId, FlagEntry>,
}

impl FrozenFlags {
    pub fn get(&self, flag: &FlagId) -> FlagState {
        self.entries
            .get(flag)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    pub fn provenance(&self, flag: &FlagId) -> Option<&Provenance> {
        self.entries.get(flag).map(|entry| &entry.provenance)
    }

    pub fn entry(&self, flag: &FlagId) -> Option<&FlagEntry> {
        self.entries.get(flag)
    }

    /// Iterates every touched flag in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&FlagId, &FlagEntry)> {
        self.entries.iter()
    }

    /// Iterates enabled flags in identifier order.
    pub fn enabled(&self) -> impl Iterator<Item = &FlagId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state == FlagState::Enabled)
            .map(|(flag, _)| flag)
    }

    /// Flag to state mapping handed to the build toolchain
    pub fn states(&self) -> BTreeMap<FlagId, FlagState> {
        self.entries
            .iter()
            .map(|(flag, entry)| (flag.clone(), entry.state))
            .collect()
    }

    /// Rebuilds a store whose explicit input is this result's enabled and
    /// disabled flags. Used to check that convergence is idempotent.
    pub fn to_input_store(&self, source: InputSource) -> FlagStore {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.state != FlagState::Unset)
            .map(|(flag, entry)| {
                (
                    flag.clone(),
                    FlagEntry {
                        state: entry.state,
                        provenance: Provenance::Explicit { source },
                    },
                )
            })
            .collect();
        FlagStore { entries }
    }
}

impl FlagView for FrozenFlags {
    fn is_enabled(&self, flag: &FlagId) -> bool {
        self.get(flag) == FlagState::Enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> FlagId {
        FlagId::from(name)
    }

    #[test]
    fn test_get_untouched_is_unset() {
        let store = FlagStore::new();
        assert_eq!(store.get(&id("A")), FlagState::Unset);
        assert!(store.provenance(&id("A")).is_none());
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut store = FlagStore::new();
        store.set(id("A"), FlagState::Enabled, InputSource::Api).unwrap();
        store.set(id("A"), FlagState::Enabled, InputSource::CommandLine).unwrap();
        assert_eq!(store.get(&id("A")), FlagState::Enabled);
        assert_eq!(
            store.provenance(&id("A")),
            Some(&Provenance::Explicit { source: InputSource::Api })
        );
    }

    #[test]
    fn test_set_contradiction_is_conflict() {
        let mut store = FlagStore::new();
        store.set(id("A"), FlagState::Enabled, InputSource::ConfigFile).unwrap();
        let err = store
            .set(id("A"), FlagState::Disabled, InputSource::CommandLine)
            .unwrap_err();
        match err {
            FlagError::Conflict(Conflict::ContradictoryInput {
                flag,
                existing,
                requested,
                ..
            }) => {
                assert_eq!(flag, id("A"));
                assert_eq!(existing, FlagState::Enabled);
                assert_eq!(requested, FlagState::Disabled);
            }
            other => panic!("Expected ContradictoryInput, got {:?}", other),
        }
    }

    #[test]
    fn test_set_unset_untouched_is_noop() {
        let mut store = FlagStore::new();
        store.set(id("A"), FlagState::Unset, InputSource::Api).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_rejects_invalid_identifier() {
        let mut store = FlagStore::new();
        let err = store
            .set(id("not valid"), FlagState::Enabled, InputSource::Api)
            .unwrap_err();
        assert_eq!(err, FlagError::InvalidIdentifier("not valid".into()));
    }

    #[test]
    fn test_enable_derived_refuses_explicit_disable() {
        let mut store = FlagStore::new();
        store.set(id("F"), FlagState::Disabled, InputSource::ConfigFile).unwrap();
        let err = store
            .enable_derived(&id("F"), &[RuleId::from("needs_f")], 1)
            .unwrap_err();
        assert!(matches!(err, Conflict::ExplicitlyDisabled { .. }));
        assert_eq!(store.get(&id("F")), FlagState::Disabled);
    }

    #[test]
    fn test_enable_derived_reports_change_once() {
        let mut store = FlagStore::new();
        assert!(store.enable_derived(&id("G"), &[RuleId::from("r")], 1).unwrap());
        assert!(!store.enable_derived(&id("G"), &[RuleId::from("r2")], 2).unwrap());
        assert_eq!(
            store.provenance(&id("G")),
            Some(&Provenance::Derived {
                rules: vec![RuleId::from("r")],
                pass: 1
            })
        );
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = FlagStore::new();
        store.set(id("A"), FlagState::Enabled, InputSource::Api).unwrap();
        let snapshot = store.snapshot();
        store.enable_derived(&id("B"), &[RuleId::from("r")], 1).unwrap();
        assert!(snapshot.is_enabled(&id("A")));
        assert!(!snapshot.is_enabled(&id("B")));
    }

    #[test]
    fn test_freeze_preserves_states() {
        let mut store = FlagStore::new();
        store.set(id("A"), FlagState::Enabled, InputSource::Api).unwrap();
        store.set(id("B"), FlagState::Disabled, InputSource::Api).unwrap();
        let frozen = store.freeze();
        assert!(frozen.is_enabled(&id("A")));
        assert_eq!(frozen.get(&id("B")), FlagState::Disabled);
        assert_eq!(frozen.enabled().count(), 1);
    }
}
