//! Rule set subsystem
//!
//! Rules are declarative implications `antecedent => enable consequent`,
//! each tagged with a category:
//!
//! - hard dependency
//! - legacy compatibility (reported as a notice when it fires)
//! - internal alias (result is an implementation-detail flag)

mod set;
mod types;

pub use set::{RuleError, RuleResult, RuleSet};
pub use types::{Expr, Rule, RuleCategory, RuleId};
