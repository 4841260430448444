//! User input to a resolution

use std::collections::BTreeSet;

use crate::flags::{FlagId, FlagResult, FlagState, FlagStore, InputSource};

/// One explicit flag setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFlag {
    pub flag: FlagId,
    pub state: FlagState,
    pub source: InputSource,
}

/// Explicit flag settings and required capabilities.
///
/// Settings are applied in insertion order, so two settings of the same
/// flag from the same layer must agree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionInput {
    flags: Vec<InputFlag>,
    require_capabilities: BTreeSet<String>,
}

impl ResolutionInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, flag: impl Into<FlagId>, state: FlagState, source: InputSource) -> Self {
        self.push(flag.into(), state, source);
        self
    }

    pub fn enable(self, flag: impl Into<FlagId>) -> Self {
        self.set(flag, FlagState::Enabled, InputSource::Api)
    }

    pub fn disable(self, flag: impl Into<FlagId>) -> Self {
        self.set(flag, FlagState::Disabled, InputSource::Api)
    }

    pub fn require(mut self, capability: impl Into<String>) -> Self {
        self.require_capabilities.insert(capability.into());
        self
    }

    pub fn push(&mut self, flag: FlagId, state: FlagState, source: InputSource) {
        self.flags.push(InputFlag {
            flag,
            state,
            source,
        });
    }

    /// Applies a command-line setting. It replaces any config-file setting
    /// of the same flag; earlier command-line settings are kept, so
    /// contradicting ones still conflict.
    pub fn override_flag(&mut self, flag: FlagId, state: FlagState) {
        self.flags
            .retain(|entry| !(entry.flag == flag && entry.source == InputSource::ConfigFile));
        self.push(flag, state, InputSource::CommandLine);
    }

    pub fn add_requirement(&mut self, capability: impl Into<String>) {
        self.require_capabilities.insert(capability.into());
    }

    pub fn flags(&self) -> &[InputFlag] {
        &self.flags
    }

    /// Required capabilities in name order
    pub fn required_capabilities(&self) -> Vec<String> {
        self.require_capabilities.iter().cloned().collect()
    }

    /// Builds the initial store.
    ///
    /// # Errors
    ///
    /// The first `FlagError` raised by `FlagStore::set`.
    pub fn to_store(&self) -> FlagResult<FlagStore> {
        let mut store = FlagStore::new();
        for entry in &self.flags {
            store.set(entry.flag.clone(), entry.state, entry.source)?;
        }
        Ok(store)
    }
}
