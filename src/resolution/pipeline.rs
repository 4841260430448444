//! End-to-end resolution
//!
//! input -> flag store -> resolver -> capability layer -> validator -> report
//!
//! Requested capabilities are checked against the table before any pass
//! runs, so an unknown name never costs a resolution.

use std::collections::BTreeSet;

use super::errors::{ResolutionError, ResolutionResult};
use super::input::ResolutionInput;
use super::report::{ResolutionReport, ResolutionStats};
use crate::capability::{CapabilityError, CapabilityLayer};
use crate::flags::Provenance;
use crate::observability::{ObservationScope, Severity};
use crate::resolver::{Resolver, ResolverOptions};
use crate::table::RuleTable;
use crate::validator::Validator;

/// Resolves `input` against `table`.
///
/// # Errors
///
/// Exactly one `ResolutionError`; see its `kind()` for the classification.
pub fn resolve(
    table: &RuleTable,
    input: &ResolutionInput,
    options: ResolverOptions,
) -> ResolutionResult<ResolutionReport> {
    let version = table.version().to_string();
    let scope = ObservationScope::with_fields("RESOLVE", &[("table_version", version.as_str())]);

    match run(table, input, options) {
        Ok(report) => {
            let passes = report.stats.passes.to_string();
            let derived = report.stats.derived.to_string();
            scope.complete_with_fields(&[("passes", passes.as_str()), ("derived", derived.as_str())]);
            Ok(report)
        }
        Err(err) => {
            let severity = match err.severity() {
                super::Severity::Reject => Severity::Warn,
                super::Severity::Fatal => Severity::Error,
            };
            let reason = err.to_string();
            scope.fail(severity, &[("code", err.code()), ("reason", reason.as_str())]);
            Err(err)
        }
    }
}

fn run(
    table: &RuleTable,
    input: &ResolutionInput,
    options: ResolverOptions,
) -> ResolutionResult<ResolutionReport> {
    let requested = input.required_capabilities();
    if let Some(unknown) = requested
        .iter()
        .find(|name| !table.capabilities().contains(name))
    {
        return Err(CapabilityError::UnknownCapability(unknown.clone()).into());
    }

    let store = input.to_store()?;
    let explicit = store.len();

    let resolved = Resolver::with_options(table.rules(), store, options).resolve()?;

    let layer = CapabilityLayer::new(table.capabilities()).bind(&resolved.flags);
    Validator::new(table.constraints()).check(&resolved.flags, &layer, &requested)?;
    let capabilities = layer.report()?;

    let rules_fired = resolved
        .flags
        .iter()
        .filter_map(|(_, entry)| match &entry.provenance {
            Provenance::Derived { rules, .. } => Some(rules.iter()),
            Provenance::Explicit { .. } => None,
        })
        .flatten()
        .collect::<BTreeSet<_>>()
        .len();

    let stats = ResolutionStats {
        passes: resolved.pass_count(),
        rules_fired,
        derived: resolved.derived_count(),
        explicit,
    };

    Ok(ResolutionReport {
        table_version: table.version(),
        flags: resolved.flags,
        capabilities,
        notices: resolved.notices,
        internal: resolved.internal,
        passes: resolved.passes,
        stats,
    })
}
