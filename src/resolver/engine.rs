//! Fixed-point resolver engine
//!
//! Each pass evaluates every rule against the snapshot taken after the
//! previous pass, then applies all newly-true consequents as one batch.
//! Because no rule ever observes a partially applied pass, the fixed point
//! is a function of the rule set and the input only; registration order
//! does not matter.
//!
//! Conflicts are detected in the pass where they first become derivable:
//! - a consequent that the user explicitly disabled
//! - a flag enabled after a rule already fired on its absence

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::errors::{ResolveError, ResolveResult};
use super::state::{EngineState, FailureKind};
use crate::flags::{join_ids, Conflict, FlagId, FlagStore, FlagView, FrozenFlags, Provenance};
use crate::observability::{log_event_with_fields, Event};
use crate::rules::{Rule, RuleCategory, RuleId, RuleSet};

/// Tunables for a resolver run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Upper bound on passes. Defaults to rule count + 1, which a
    /// well-formed table can never exceed.
    pub max_passes: Option<usize>,
}

/// Flags enabled by one pass, with the rules that enabled each
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassRecord {
    pub pass: usize,
    pub enabled: BTreeMap<FlagId, Vec<RuleId>>,
}

/// A flag auto-enabled for backward compatibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatNotice {
    pub flag: FlagId,
    pub rule: RuleId,
    pub pass: usize,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

impl CompatNotice {
    /// Diagnostic text for tooling
    pub fn message(&self) -> String {
        format!(
            "flag {} was auto-enabled by rule {} for backward compatibility with a previous configuration convention",
            self.flag, self.rule
        )
    }
}

/// Output of a converged resolver run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub flags: FrozenFlags,
    pub passes: Vec<PassRecord>,
    pub notices: Vec<CompatNotice>,
    /// Derived flags enabled only by internal-alias rules
    pub internal: BTreeSet<FlagId>,
}

impl Resolved {
    /// Total number of passes including the final empty one
    pub fn pass_count(&self) -> usize {
        self.passes.len() + 1
    }

    /// Number of flags the rules enabled
    pub fn derived_count(&self) -> usize {
        self.passes.iter().map(|p| p.enabled.len()).sum()
    }
}

/// Resolver engine for one resolution run.
///
/// Owns the flag store for the duration of the run and borrows the shared
/// rule set.
pub struct Resolver<'r> {
    rules: &'r RuleSet,
    store: FlagStore,
    max_passes: usize,
    state: EngineState,
    failure: Option<ResolveError>,
    passes: Vec<PassRecord>,
    notices: Vec<CompatNotice>,
    /// Rules that contributed a consequent, in the pass they did so
    contributors: BTreeMap<RuleId, usize>,
}

impl<'r> Resolver<'r> {
    pub fn new(rules: &'r RuleSet, store: FlagStore) -> Self {
        Self::with_options(rules, store, ResolverOptions::default())
    }

    pub fn with_options(rules: &'r RuleSet, store: FlagStore, options: ResolverOptions) -> Self {
        Self {
            rules,
            store,
            max_passes: options.max_passes.unwrap_or(rules.len() + 1),
            state: EngineState::Idle,
            failure: None,
            passes: Vec::new(),
            notices: Vec::new(),
            contributors: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Read access to the store while iterating
    pub fn store(&self) -> &FlagStore {
        &self.store
    }

    /// Runs one pass.
    ///
    /// A no-op once converged. Returns the stored error once failed.
    pub fn step(&mut self) -> ResolveResult<EngineState> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.state.is_converged() {
            return Ok(self.state);
        }

        if self.state == EngineState::Idle {
            let rules = self.rules.len().to_string();
            let input_flags = self.store.len().to_string();
            log_event_with_fields(
                Event::ResolveBegin,
                &[("rules", rules.as_str()), ("input_flags", input_flags.as_str())],
            );
        }

        let pass = self.passes.len() + 1;
        if pass > self.max_passes {
            let still_changing = self
                .passes
                .last()
                .map(|p| p.enabled.keys().cloned().collect())
                .unwrap_or_default();
            return Err(self.fail(ResolveError::NonTermination {
                passes: self.passes.len(),
                still_changing,
            }));
        }

        let snapshot = self.store.snapshot();
        let mut batch: BTreeMap<FlagId, Vec<RuleId>> = BTreeMap::new();
        for rule in self.rules {
            if !snapshot.is_enabled(&rule.consequent) && rule.applies(&snapshot) {
                batch
                    .entry(rule.consequent.clone())
                    .or_default()
                    .push(rule.id.clone());
            }
        }

        if batch.is_empty() {
            self.state = EngineState::Converged { passes: pass };
            let passes = pass.to_string();
            let derived = self.derived_count().to_string();
            log_event_with_fields(
                Event::ResolveConverged,
                &[("passes", passes.as_str()), ("derived", derived.as_str())],
            );
            return Ok(self.state);
        }

        for rules in batch.values_mut() {
            rules.sort();
        }

        self.apply_batch(pass, &batch)?;
        self.check_negated_dependencies(pass, &batch)?;

        let pass_str = pass.to_string();
        let enabled = batch.len().to_string();
        log_event_with_fields(
            Event::PassComplete,
            &[("pass", pass_str.as_str()), ("enabled", enabled.as_str())],
        );
        self.passes.push(PassRecord {
            pass,
            enabled: batch,
        });
        self.state = EngineState::Iterating { pass };
        Ok(self.state)
    }

    /// Runs passes until a terminal state.
    pub fn run(&mut self) -> ResolveResult<()> {
        while !self.state.is_terminal() {
            self.step()?;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Runs to the fixed point and freezes the store.
    pub fn resolve(mut self) -> ResolveResult<Resolved> {
        self.run()?;

        let internal = self.internal_flags();
        Ok(Resolved {
            flags: self.store.freeze(),
            passes: self.passes,
            notices: self.notices,
            internal,
        })
    }

    fn apply_batch(&mut self, pass: usize, batch: &BTreeMap<FlagId, Vec<RuleId>>) -> ResolveResult<()> {
        let rules = self.rules;
        for (flag, rule_ids) in batch {
            if let Err(conflict) = self.store.enable_derived(flag, rule_ids, pass) {
                return Err(self.fail(ResolveError::Conflict { conflict, pass }));
            }

            let pass_str = pass.to_string();
            let ids = join_ids(rule_ids);
            log_event_with_fields(
                Event::FlagDerived,
                &[
                    ("flag", flag.as_str()),
                    ("pass", pass_str.as_str()),
                    ("rules", ids.as_str()),
                ],
            );

            for id in rule_ids {
                self.contributors.entry(id.clone()).or_insert(pass);
                if let Some(rule) = rules.get(id) {
                    if rule.category == RuleCategory::LegacyCompat {
                        self.record_notice(rule, pass);
                    }
                }
            }
        }
        Ok(())
    }

    /// A contributing rule whose antecedent no longer holds fired on the
    /// absence of a flag that this batch enabled.
    fn check_negated_dependencies(
        &mut self,
        pass: usize,
        batch: &BTreeMap<FlagId, Vec<RuleId>>,
    ) -> ResolveResult<()> {
        let after = self.store.snapshot();
        let mut violation = None;
        for id in self.contributors.keys() {
            let Some(rule) = self.rules.get(id) else {
                continue;
            };
            if rule.applies(&after) {
                continue;
            }
            let flipped = rule
                .antecedent
                .negated_flags()
                .into_iter()
                .find(|flag| batch.contains_key(flag));
            if let Some(flag) = flipped {
                let enabled_by = batch.get(&flag).cloned().unwrap_or_default();
                violation = Some(Conflict::NegatedDependency {
                    flag,
                    rule: id.clone(),
                    enabled_by,
                });
                break;
            }
        }

        match violation {
            Some(conflict) => Err(self.fail(ResolveError::Conflict { conflict, pass })),
            None => Ok(()),
        }
    }

    fn record_notice(&mut self, rule: &Rule, pass: usize) {
        let notice = CompatNotice {
            flag: rule.consequent.clone(),
            rule: rule.id.clone(),
            pass,
            rationale: rule.rationale.clone(),
        };
        let message = notice.message();
        log_event_with_fields(
            Event::LegacyCompatAutoEnable,
            &[
                ("flag", notice.flag.as_str()),
                ("rule", notice.rule.as_str()),
                ("message", message.as_str()),
            ],
        );
        self.notices.push(notice);
    }

    fn fail(&mut self, err: ResolveError) -> ResolveError {
        let (kind, event) = match &err {
            ResolveError::Conflict { .. } => (FailureKind::Conflict, Event::ResolveConflict),
            ResolveError::NonTermination { .. } => {
                (FailureKind::NonTermination, Event::ResolveNonTermination)
            }
        };
        let reason = err.to_string();
        log_event_with_fields(event, &[("reason", reason.as_str())]);
        self.state = EngineState::Failed(kind);
        self.failure = Some(err.clone());
        err
    }

    fn derived_count(&self) -> usize {
        self.passes.iter().map(|p| p.enabled.len()).sum()
    }

    fn internal_flags(&self) -> BTreeSet<FlagId> {
        self.store
            .enabled()
            .filter(|flag| match self.store.provenance(flag) {
                Some(Provenance::Derived { rules, .. }) => rules.iter().all(|id| {
                    self.rules
                        .get(id)
                        .is_some_and(|r| r.category == RuleCategory::InternalAlias)
                }),
                _ => false,
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{FlagState, InputSource};
    use crate::rules::Expr;

    fn store_with(enabled: &[&str], disabled: &[&str]) -> FlagStore {
        let mut store = FlagStore::new();
        for name in enabled {
            store
                .set(FlagId::from(*name), FlagState::Enabled, InputSource::Api)
                .unwrap();
        }
        for name in disabled {
            store
                .set(FlagId::from(*name), FlagState::Disabled, InputSource::Api)
                .unwrap();
        }
        store
    }

    fn chain() -> RuleSet {
        let mut rules = RuleSet::new();
        rules
            .add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency)
            .unwrap();
        rules
            .add("b_c", Expr::flag("B"), "C", RuleCategory::HardDependency)
            .unwrap();
        rules
    }

    #[test]
    fn test_state_transitions() {
        let rules = chain();
        let mut resolver = Resolver::new(&rules, store_with(&["A"], &[]));
        assert_eq!(resolver.state(), EngineState::Idle);

        assert_eq!(resolver.step().unwrap(), EngineState::Iterating { pass: 1 });
        assert!(resolver.store().get(&FlagId::from("B")).is_enabled());
        assert!(!resolver.store().get(&FlagId::from("C")).is_enabled());

        assert_eq!(resolver.step().unwrap(), EngineState::Iterating { pass: 2 });
        assert_eq!(resolver.step().unwrap(), EngineState::Converged { passes: 3 });
        // Terminal: further steps are no-ops
        assert_eq!(resolver.step().unwrap(), EngineState::Converged { passes: 3 });
    }

    #[test]
    fn test_pass_uses_previous_snapshot() {
        // B is derived in pass 1, so C can only appear in pass 2
        let rules = chain();
        let resolved = Resolver::new(&rules, store_with(&["A"], &[])).resolve().unwrap();
        assert_eq!(resolved.passes.len(), 2);
        assert!(resolved.passes[0].enabled.contains_key(&FlagId::from("B")));
        assert!(resolved.passes[1].enabled.contains_key(&FlagId::from("C")));
        assert_eq!(resolved.pass_count(), 3);
        assert_eq!(resolved.derived_count(), 2);
    }

    #[test]
    fn test_explicit_disable_conflict() {
        let rules = chain();
        let mut resolver = Resolver::new(&rules, store_with(&["A"], &["C"]));
        let err = resolver.run().unwrap_err();
        assert_eq!(resolver.state(), EngineState::Failed(FailureKind::Conflict));
        match err {
            ResolveError::Conflict {
                conflict: Conflict::ExplicitlyDisabled { flag, rules, origin },
                pass,
            } => {
                assert_eq!(flag, FlagId::from("C"));
                assert_eq!(rules, vec![RuleId::from("b_c")]);
                assert_eq!(origin, InputSource::Api);
                assert_eq!(pass, 2);
            }
            other => panic!("Expected explicit-disable conflict, got {:?}", other),
        }
        // Failure is sticky
        assert!(resolver.step().is_err());
    }

    #[test]
    fn test_negated_dependency_conflict() {
        let mut rules = RuleSet::new();
        rules
            .add(
                "no_f_gives_g",
                Expr::all([Expr::flag("A"), Expr::not(Expr::flag("F"))]),
                "G",
                RuleCategory::HardDependency,
            )
            .unwrap();
        rules
            .add("g_needs_f", Expr::flag("G"), "F", RuleCategory::HardDependency)
            .unwrap();

        let err = Resolver::new(&rules, store_with(&["A"], &[]))
            .resolve()
            .unwrap_err();
        match err {
            ResolveError::Conflict {
                conflict: Conflict::NegatedDependency { flag, rule, enabled_by },
                ..
            } => {
                assert_eq!(flag, FlagId::from("F"));
                assert_eq!(rule, RuleId::from("no_f_gives_g"));
                assert_eq!(enabled_by, vec![RuleId::from("g_needs_f")]);
            }
            other => panic!("Expected negated dependency conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_negation_on_disjunct_is_not_a_conflict() {
        // G holds through A regardless of F
        let mut rules = RuleSet::new();
        rules
            .add(
                "g",
                Expr::any([Expr::flag("A"), Expr::not(Expr::flag("F"))]),
                "G",
                RuleCategory::HardDependency,
            )
            .unwrap();
        rules
            .add("f", Expr::flag("G"), "F", RuleCategory::HardDependency)
            .unwrap();
        let resolved = Resolver::new(&rules, store_with(&["A"], &[])).resolve().unwrap();
        assert!(resolved.flags.is_enabled(&FlagId::from("F")));
    }

    #[test]
    fn test_non_termination_bound() {
        let rules = chain();
        let options = ResolverOptions { max_passes: Some(1) };
        let mut resolver = Resolver::with_options(&rules, store_with(&["A"], &[]), options);
        let err = resolver.run().unwrap_err();
        assert_eq!(
            err,
            ResolveError::NonTermination {
                passes: 1,
                still_changing: vec![FlagId::from("B")],
            }
        );
        assert_eq!(
            resolver.state(),
            EngineState::Failed(FailureKind::NonTermination)
        );
    }

    #[test]
    fn test_legacy_compat_notice_recorded() {
        let mut rules = RuleSet::new();
        rules
            .add_rule(
                Rule::new("legacy", Expr::flag("OLD"), "GLUE", RuleCategory::LegacyCompat)
                    .with_rationale("OLD used GLUE implicitly"),
            )
            .unwrap();
        let resolved = Resolver::new(&rules, store_with(&["OLD"], &[])).resolve().unwrap();
        assert_eq!(resolved.notices.len(), 1);
        assert_eq!(resolved.notices[0].flag, FlagId::from("GLUE"));
        assert_eq!(resolved.notices[0].rationale, "OLD used GLUE implicitly");
        assert!(resolved.notices[0].message().contains("backward compatibility"));
    }

    #[test]
    fn test_internal_alias_flags_reported() {
        let mut rules = RuleSet::new();
        rules
            .add("alias", Expr::flag("X"), "X_LIGHT", RuleCategory::InternalAlias)
            .unwrap();
        rules
            .add("dep", Expr::flag("X"), "Y", RuleCategory::HardDependency)
            .unwrap();
        let resolved = Resolver::new(&rules, store_with(&["X"], &[])).resolve().unwrap();
        assert!(resolved.internal.contains(&FlagId::from("X_LIGHT")));
        assert!(!resolved.internal.contains(&FlagId::from("Y")));
    }

    #[test]
    fn test_empty_rule_set_converges_immediately() {
        let rules = RuleSet::new();
        let mut resolver = Resolver::new(&rules, store_with(&["A"], &[]));
        assert_eq!(resolver.step().unwrap(), EngineState::Converged { passes: 1 });
    }
}
