//! Resolution pipeline
//!
//! The single entry point most callers need: `resolve` a `ResolutionInput`
//! against a `RuleTable` and get either a `ResolutionReport` or one
//! classified `ResolutionError`.

mod errors;
mod input;
mod pipeline;
mod report;

pub use errors::{ResolutionError, ResolutionErrorKind, ResolutionResult, Severity};
pub use input::{InputFlag, ResolutionInput};
pub use pipeline::resolve;
pub use report::{ExplainStep, ResolutionReport, ResolutionStats};
