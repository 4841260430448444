//! Resolver Invariant Tests
//!
//! Properties:
//! - Monotonicity: a flag enabled during resolution stays enabled
//! - Explicit disables are never overridden
//! - Capability availability matches its provider paths exactly
//!
//! Plus the reference scenarios: driver-only capability, explicit-disable
//! conflict, mutual rules without a base case, and two rules reaching the
//! same flag in one pass.

use std::collections::BTreeSet;

use cfgresolver::capability::{CapabilityError, CapabilityLayer, CapabilityRegistry, ProviderPath};
use cfgresolver::flags::{Conflict, FlagId, FlagState, FlagStore, FlagView, InputSource, Provenance};
use cfgresolver::resolution::{resolve, ResolutionError, ResolutionErrorKind, ResolutionInput};
use cfgresolver::resolver::{EngineState, FailureKind, ResolveError, Resolver, ResolverOptions};
use cfgresolver::rules::{Expr, RuleCategory, RuleId, RuleSet};
use cfgresolver::table::RuleTable;
use cfgresolver::validator::ConstraintSet;

// =============================================================================
// Test Utilities
// =============================================================================

fn store(enabled: &[&str], disabled: &[&str]) -> FlagStore {
    let mut store = FlagStore::new();
    for name in enabled {
        store
            .set(FlagId::from(*name), FlagState::Enabled, InputSource::ConfigFile)
            .unwrap();
    }
    for name in disabled {
        store
            .set(FlagId::from(*name), FlagState::Disabled, InputSource::ConfigFile)
            .unwrap();
    }
    store
}

fn enabled_set(store: &FlagStore) -> BTreeSet<FlagId> {
    store.enabled().cloned().collect()
}

fn ecdh_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_capability(
            "CAN_ECDH",
            vec![
                ProviderPath::builtin(["BUILTIN_ECDH"]),
                ProviderPath::driver(["ACCEL_ECDH"]),
            ],
        )
        .unwrap();
    registry
}

// =============================================================================
// Monotonicity
// =============================================================================

/// The enabled set only grows from pass to pass.
#[test]
fn test_enabled_set_only_grows() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency).unwrap();
    rules.add("b_c", Expr::flag("B"), "C", RuleCategory::HardDependency).unwrap();
    rules
        .add("bc_d", Expr::all_of(["B", "C"]), "D", RuleCategory::LegacyCompat)
        .unwrap();

    let mut resolver = Resolver::new(&rules, store(&["A"], &[]));
    let mut previous = enabled_set(resolver.store());
    while !resolver.state().is_terminal() {
        resolver.step().unwrap();
        let current = enabled_set(resolver.store());
        assert!(
            current.is_superset(&previous),
            "Pass dropped flags: {:?} -> {:?}",
            previous,
            current
        );
        previous = current;
    }
    assert_eq!(resolver.state(), EngineState::Converged { passes: 4 });
}

/// Every flag recorded in a pass is enabled in the final result.
#[test]
fn test_every_derived_flag_survives_to_convergence() {
    let table = RuleTable::builtin().unwrap();
    let resolved = Resolver::new(
        table.rules(),
        store(&["MBEDTLS_PSA_CRYPTO_C", "MBEDTLS_RSA_C", "MBEDTLS_ECP_C"], &[]),
    )
    .resolve()
    .unwrap();
    for record in &resolved.passes {
        for flag in record.enabled.keys() {
            assert!(resolved.flags.is_enabled(flag), "{} was lost", flag);
        }
    }
}

// =============================================================================
// Conservation Of Explicit Disables
// =============================================================================

/// Disabled flags nobody needs stay disabled.
#[test]
fn test_unneeded_disable_is_preserved() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency).unwrap();
    let resolved = Resolver::new(&rules, store(&["A"], &["Z"])).resolve().unwrap();
    assert_eq!(resolved.flags.get(&FlagId::from("Z")), FlagState::Disabled);
    assert_eq!(
        resolved.flags.provenance(&FlagId::from("Z")),
        Some(&Provenance::Explicit {
            source: InputSource::ConfigFile
        })
    );
}

/// A rule needing a disabled flag fails resolution instead of flipping it.
#[test]
fn test_needed_disable_fails_instead_of_flipping() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::LegacyCompat).unwrap();
    let mut resolver = Resolver::new(&rules, store(&["A"], &["B"]));
    assert!(resolver.run().is_err());
    assert_eq!(resolver.store().get(&FlagId::from("B")), FlagState::Disabled);
    assert_eq!(resolver.state(), EngineState::Failed(FailureKind::Conflict));
}

// =============================================================================
// Capability Correctness
// =============================================================================

/// Available iff at least one provider path's conjunction holds.
#[test]
fn test_capability_matches_paths() {
    let mut registry = CapabilityRegistry::new();
    registry
        .register_capability(
            "CAN_SIGN",
            vec![
                ProviderPath::builtin(["SIGN_C"]).excluding(["USE_DRIVERS"]),
                ProviderPath::driver(["USE_DRIVERS", "WANT_SIGN", "WANT_KEY"]),
            ],
        )
        .unwrap();

    let cases: [(&[&str], bool); 6] = [
        (&[], false),
        (&["SIGN_C"], true),
        (&["SIGN_C", "USE_DRIVERS"], false),
        (&["USE_DRIVERS", "WANT_SIGN"], false),
        (&["USE_DRIVERS", "WANT_SIGN", "WANT_KEY"], true),
        (&["SIGN_C", "USE_DRIVERS", "WANT_SIGN", "WANT_KEY"], true),
    ];
    let no_rules = RuleSet::new();
    for (enabled, expected) in cases {
        let flags = Resolver::new(&no_rules, store(enabled, &[])).resolve().unwrap().flags;
        let layer = CapabilityLayer::new(&registry).bind(&flags);
        let availability = layer.is_available("CAN_SIGN").unwrap();
        assert_eq!(availability.available, expected, "Input {:?}", enabled);

        let capability = registry.get("CAN_SIGN").unwrap();
        let holding: Vec<_> = capability.paths.iter().filter(|p| p.holds(&flags)).cloned().collect();
        assert_eq!(availability.satisfied_by, holding);
    }
}

/// Querying before convergence is an error, not a guess.
#[test]
fn test_capability_query_before_resolution() {
    let registry = ecdh_registry();
    let err = CapabilityLayer::new(&registry).is_available("CAN_ECDH").unwrap_err();
    assert_eq!(err.to_string(), "capability 'CAN_ECDH' queried before resolution converged");
}

/// Flags only become queryable through a converged run; mid-run state is
/// never bound.
#[test]
fn test_capability_answers_only_after_convergence() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency).unwrap();
    let mut registry = CapabilityRegistry::new();
    registry
        .register_capability("CAN_B", vec![ProviderPath::builtin(["B"])])
        .unwrap();

    let mut resolver = Resolver::new(&rules, store(&["A"], &[]));
    assert_eq!(resolver.state(), EngineState::Idle);
    let layer = CapabilityLayer::new(&registry);
    assert_eq!(
        layer.is_available("CAN_B").unwrap_err(),
        CapabilityError::NotResolved("CAN_B".to_string())
    );

    resolver.step().unwrap();
    assert!(!resolver.state().is_terminal());
    assert!(layer.is_available("CAN_B").is_err());

    let resolved = resolver.resolve().unwrap();
    let bound = layer.bind(&resolved.flags);
    assert!(bound.is_available("CAN_B").unwrap().available);
}

// =============================================================================
// Scenarios
// =============================================================================

/// Accelerator-only input: available through the driver path, builtin unset.
#[test]
fn test_scenario_driver_only_capability() {
    let table = RuleTable::new(1, RuleSet::new(), ecdh_registry(), ConstraintSet::new()).unwrap();
    let input = ResolutionInput::new().enable("ACCEL_ECDH").require("CAN_ECDH");
    let report = resolve(&table, &input, ResolverOptions::default()).unwrap();

    let availability = report.capability("CAN_ECDH").unwrap();
    assert!(availability.available);
    assert_eq!(availability.satisfied_names(), vec!["driver"]);
    assert_eq!(report.flags.get(&FlagId::from("BUILTIN_ECDH")), FlagState::Unset);
}

/// Explicit disable of a hard dependency: Conflict naming flag and rule.
#[test]
fn test_scenario_explicit_disable_conflict() {
    let mut rules = RuleSet::new();
    rules
        .add("tls_needs_f", Expr::flag("TLS"), "F", RuleCategory::HardDependency)
        .unwrap();
    let table = RuleTable::new(1, rules, CapabilityRegistry::new(), ConstraintSet::new()).unwrap();
    let input = ResolutionInput::new().enable("TLS").disable("F");

    let err = resolve(&table, &input, ResolverOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ResolutionErrorKind::Conflict);
    match err {
        ResolutionError::Conflict {
            conflict: Conflict::ExplicitlyDisabled { flag, rules, origin },
            pass,
        } => {
            assert_eq!(flag, FlagId::from("F"));
            assert_eq!(rules, vec![RuleId::from("tls_needs_f")]);
            assert_eq!(origin, InputSource::Api);
            assert_eq!(pass, 1);
        }
        other => panic!("Expected explicit-disable conflict, got {:?}", other),
    }
}

/// A -> B and B -> A with no trigger converge with both unset; a trigger
/// activates both.
#[test]
fn test_scenario_mutual_rules_without_base_case() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency).unwrap();
    rules.add("b_a", Expr::flag("B"), "A", RuleCategory::HardDependency).unwrap();

    let idle = Resolver::new(&rules, store(&[], &[])).resolve().unwrap();
    assert_eq!(idle.flags.get(&FlagId::from("A")), FlagState::Unset);
    assert_eq!(idle.flags.get(&FlagId::from("B")), FlagState::Unset);
    assert_eq!(idle.pass_count(), 1);

    let triggered = Resolver::new(&rules, store(&["B"], &[])).resolve().unwrap();
    assert!(triggered.flags.is_enabled(&FlagId::from("A")));
    assert!(triggered.flags.is_enabled(&FlagId::from("B")));
    assert_eq!(triggered.derived_count(), 1);
}

/// Two rules reach G in the same pass: enabled once, both recorded.
#[test]
fn test_scenario_two_rules_same_target() {
    let mut rules = RuleSet::new();
    rules.add("x_g", Expr::flag("X"), "G", RuleCategory::HardDependency).unwrap();
    rules.add("y_g", Expr::flag("Y"), "G", RuleCategory::HardDependency).unwrap();

    let resolved = Resolver::new(&rules, store(&["X", "Y"], &[])).resolve().unwrap();
    assert_eq!(resolved.derived_count(), 1);
    assert_eq!(
        resolved.flags.provenance(&FlagId::from("G")),
        Some(&Provenance::Derived {
            rules: vec![RuleId::from("x_g"), RuleId::from("y_g")],
            pass: 1,
        })
    );
}

// =============================================================================
// Non-Termination
// =============================================================================

/// Exceeding the pass bound is reported as a table bug.
#[test]
fn test_pass_bound_exceeded_is_table_bug() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency).unwrap();
    rules.add("b_c", Expr::flag("B"), "C", RuleCategory::HardDependency).unwrap();
    let table = RuleTable::new(1, rules, CapabilityRegistry::new(), ConstraintSet::new()).unwrap();
    let input = ResolutionInput::new().enable("A");

    let err = resolve(&table, &input, ResolverOptions { max_passes: Some(1) }).unwrap_err();
    assert_eq!(err.code(), "CFG_NON_TERMINATION");
    assert!(err.is_table_bug());

    // The default bound is never hit by a well-formed table
    assert!(resolve(&table, &input, ResolverOptions::default()).is_ok());
}

/// Resolver-level error carries the flags still changing.
#[test]
fn test_non_termination_reports_changing_flags() {
    let mut rules = RuleSet::new();
    rules.add("a_b", Expr::flag("A"), "B", RuleCategory::HardDependency).unwrap();
    rules.add("b_c", Expr::flag("B"), "C", RuleCategory::HardDependency).unwrap();
    let err = Resolver::with_options(&rules, store(&["A"], &[]), ResolverOptions { max_passes: Some(2) })
        .resolve()
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::NonTermination {
            passes: 2,
            still_changing: vec![FlagId::from("C")],
        }
    );
}
