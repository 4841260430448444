//! Resolution report handed to the build toolchain

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::capability::Availability;
use crate::flags::{FlagId, FlagState, FlagView, FrozenFlags, Provenance};
use crate::resolver::{CompatNotice, PassRecord};
use crate::rules::{RuleId, RuleSet};

/// Counters describing one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Passes run, including the final empty pass
    pub passes: usize,
    /// Distinct rules that enabled at least one flag
    pub rules_fired: usize,
    /// Flags enabled by rules
    pub derived: usize,
    /// Flags set explicitly
    pub explicit: usize,
}

/// Result of a converged, validated resolution. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub table_version: u32,
    pub flags: FrozenFlags,
    /// Every capability in name order
    pub capabilities: Vec<Availability>,
    pub notices: Vec<CompatNotice>,
    /// Flags derived only through internal-alias rules
    pub internal: BTreeSet<FlagId>,
    pub passes: Vec<PassRecord>,
    pub stats: ResolutionStats,
}

impl ResolutionReport {
    /// Flag states without internal-only flags
    pub fn public_flags(&self) -> BTreeMap<FlagId, FlagState> {
        self.flags
            .states()
            .into_iter()
            .filter(|(flag, _)| !self.internal.contains(flag))
            .collect()
    }

    pub fn is_enabled(&self, flag: &FlagId) -> bool {
        self.flags.is_enabled(flag)
    }

    pub fn capability(&self, name: &str) -> Option<&Availability> {
        self.capabilities.iter().find(|a| a.capability == name)
    }

    /// Walks the provenance of `flag` back to explicit input.
    ///
    /// Returns one step per flag, depth-first, each flag at most once.
    /// Returns an empty list if the flag was never touched.
    pub fn explain(&self, flag: &FlagId, rules: &RuleSet) -> Vec<ExplainStep> {
        let mut steps = Vec::new();
        let mut seen = BTreeSet::new();
        self.explain_into(flag, rules, 0, &mut seen, &mut steps);
        steps
    }

    fn explain_into(
        &self,
        flag: &FlagId,
        rules: &RuleSet,
        depth: usize,
        seen: &mut BTreeSet<FlagId>,
        steps: &mut Vec<ExplainStep>,
    ) {
        if !seen.insert(flag.clone()) {
            return;
        }
        let Some(entry) = self.flags.entry(flag) else {
            return;
        };
        steps.push(ExplainStep {
            flag: flag.clone(),
            state: entry.state,
            provenance: entry.provenance.clone(),
            depth,
        });

        let Provenance::Derived { rules: ids, .. } = &entry.provenance else {
            return;
        };
        for id in ids {
            let Some(rule) = rules.get(id) else {
                continue;
            };
            for cause in rule.antecedent.flags() {
                if self.flags.is_enabled(&cause) {
                    self.explain_into(&cause, rules, depth + 1, seen, steps);
                }
            }
        }
    }
}

/// One link in a provenance chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainStep {
    pub flag: FlagId,
    pub state: FlagState,
    pub provenance: Provenance,
    /// 0 for the flag being explained
    pub depth: usize,
}

impl ExplainStep {
    /// Rules that derived this flag, empty for explicit input
    pub fn rules(&self) -> &[RuleId] {
        match &self.provenance {
            Provenance::Derived { rules, .. } => rules,
            Provenance::Explicit { .. } => &[],
        }
    }
}
