//! cfgresolver - A strict, deterministic build-feature configuration resolver
//!
//! Subsystems, leaves first:
//! - `flags`: tri-state flag store with provenance
//! - `rules`: order-independent implication rules
//! - `resolver`: snapshot-per-pass fixed-point engine
//! - `capability`: "can do" predicates over builtin and driver paths
//! - `validator`: post-convergence consistency checks
//! - `table`: the versioned builtin rule table
//! - `resolution`: the end-to-end pipeline
//!
//! ```ignore
//! use cfgresolver::{resolve, ResolutionInput, ResolverOptions, RuleTable};
//!
//! let table = RuleTable::builtin()?;
//! let input = ResolutionInput::new().enable("MBEDTLS_PK_PARSE_EC_COMPRESSED");
//! let report = resolve(table, &input, ResolverOptions::default())?;
//! ```

pub mod capability;
pub mod cli;
pub mod flags;
pub mod observability;
pub mod resolution;
pub mod resolver;
pub mod rules;
pub mod table;
pub mod validator;

pub use capability::{Availability, CapabilityLayer, CapabilityRegistry, ProviderPath};
pub use flags::{FlagId, FlagState, FlagStore, FrozenFlags, InputSource};
pub use resolution::{resolve, ResolutionError, ResolutionInput, ResolutionReport};
pub use resolver::{Resolver, ResolverOptions};
pub use rules::{Expr, Rule, RuleCategory, RuleSet};
pub use table::{RuleTable, RULE_TABLE_VERSION};
