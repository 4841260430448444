//! Capability registry and the resolved-state query layer
//!
//! The registry is built once with the rule table. A `CapabilityLayer`
//! answers availability questions, but only after it has been bound to the
//! frozen flags of a converged resolution.

use std::collections::BTreeMap;

use serde::Serialize;

use super::errors::{CapabilityError, CapabilityResult};
use super::types::{Availability, Capability, ProviderPath};
use crate::flags::FrozenFlags;
use crate::rules::Rule;

/// All known capabilities, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<String, Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a capability with its provider paths.
    pub fn register_capability(
        &mut self,
        name: impl Into<String>,
        paths: Vec<ProviderPath>,
    ) -> CapabilityResult<()> {
        self.register(Capability::new(name, paths))
    }

    /// Registers a fully built capability.
    ///
    /// # Errors
    ///
    /// - `EmptyName` / `DuplicateCapability` for name problems
    /// - `NoProviderPaths` if `paths` is empty
    /// - `EmptyProviderPath` if a path requires no flags
    /// - `InvalidIdentifier` if a path or the promotion target names a
    ///   malformed flag
    pub fn register(&mut self, capability: Capability) -> CapabilityResult<()> {
        let name = capability.name.clone();
        if name.is_empty() {
            return Err(CapabilityError::EmptyName);
        }
        if self.capabilities.contains_key(&name) {
            return Err(CapabilityError::DuplicateCapability(name));
        }
        if capability.paths.is_empty() {
            return Err(CapabilityError::NoProviderPaths(name));
        }

        for path in &capability.paths {
            if path.requires.is_empty() {
                return Err(CapabilityError::EmptyProviderPath {
                    capability: name,
                    path: path.name.clone(),
                });
            }
            let mut referenced = path.requires.iter().chain(path.excludes.iter());
            if let Some(bad) = referenced.find(|f| !f.is_valid()) {
                return Err(CapabilityError::InvalidIdentifier {
                    capability: name,
                    flag: bad.as_str().to_string(),
                });
            }
        }
        if let Some(target) = capability.promoted_to.as_ref().filter(|f| !f.is_valid()) {
            return Err(CapabilityError::InvalidIdentifier {
                capability: name,
                flag: target.as_str().to_string(),
            });
        }

        self.capabilities.insert(name, capability);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Iterates capabilities in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.values()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Internal-alias rules for every promoted capability, in name order.
    pub fn promotion_rules(&self) -> Vec<Rule> {
        self.capabilities
            .values()
            .filter_map(Capability::promotion_rule)
            .collect()
    }
}

/// Read-only capability queries over a converged resolution.
///
/// Never mutates flags.
#[derive(Debug, Clone, Copy)]
pub struct CapabilityLayer<'a> {
    registry: &'a CapabilityRegistry,
    flags: Option<&'a FrozenFlags>,
}

impl<'a> CapabilityLayer<'a> {
    /// Creates an unbound layer. Queries fail with `NotResolved` until
    /// `bind` is called.
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self {
            registry,
            flags: None,
        }
    }

    /// Binds the layer to converged flags.
    pub fn bind(self, flags: &'a FrozenFlags) -> Self {
        Self {
            registry: self.registry,
            flags: Some(flags),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.flags.is_some()
    }

    pub fn registry(&self) -> &'a CapabilityRegistry {
        self.registry
    }

    /// Evaluates one capability.
    ///
    /// Returns every satisfying path; when both builtin and driver paths
    /// hold, both are listed and the capability is available.
    ///
    /// # Errors
    ///
    /// - `UnknownCapability` if the name is not registered
    /// - `NotResolved` if the layer is not bound to converged flags
    pub fn is_available(&self, name: &str) -> CapabilityResult<Availability> {
        let capability = self
            .registry
            .get(name)
            .ok_or_else(|| CapabilityError::UnknownCapability(name.to_string()))?;
        let flags = self
            .flags
            .ok_or_else(|| CapabilityError::NotResolved(name.to_string()))?;

        let (satisfied_by, unsatisfied): (Vec<ProviderPath>, Vec<ProviderPath>) = capability
            .paths
            .iter()
            .cloned()
            .partition(|path| path.holds(flags));

        Ok(Availability {
            capability: capability.name.clone(),
            available: !satisfied_by.is_empty(),
            satisfied_by,
            unsatisfied,
        })
    }

    /// Evaluates every registered capability in name order.
    pub fn report(&self) -> CapabilityResult<Vec<Availability>> {
        self.registry
            .iter()
            .map(|capability| self.is_available(&capability.name))
            .collect()
    }
}
