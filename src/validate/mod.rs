//! Deliverable validation
//!
//! A [`Validator`] runs an ordered list of [`Rule`]s against each
//! deliverable. Rules never fail for a broken release policy; they record
//! errors and warnings on the shared [`ValidationContext`], and the run's
//! exit status is derived from whether any error was recorded.

pub mod context;
pub mod predicate;
pub mod rule;
pub mod rules;
pub mod runner;

pub use context::{Collaborators, Finding, ScratchDir, Severity, ValidationContext};
pub use predicate::Condition;
pub use rule::{Rule, RuleOutcome};
pub use rules::default_rules;
pub use runner::{FileOutcome, ValidationReport, Validator};
