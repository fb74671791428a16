use crate::domain::deliverable::Deliverable;
use crate::error::{ReleaseError, Result};
use crate::validate::context::{Finding, ValidationContext};
use crate::validate::rule::Rule;
use crate::validate::rules::default_rules;
use std::path::Path;

/// What happened to one input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The path no longer exists
    Deleted,
    /// The deliverable belongs to a permanently closed series
    ClosedSeries(String),
    Checked,
}

/// Runs the ordered rule list over deliverables
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<Rule>,
    closed_series: Vec<String>,
}

impl Validator {
    pub fn new(closed_series: Vec<String>) -> Self {
        Validator {
            rules: default_rules(),
            closed_series,
        }
    }

    /// Replace the rule list
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_closed(&self, series: &str) -> bool {
        self.closed_series.iter().any(|s| s == series)
    }

    /// Run every rule against one deliverable
    ///
    /// A rule that fails to complete is recorded as an error and the
    /// remaining rules still run. In debug mode the run stops at the first
    /// recorded error instead.
    pub fn validate_deliverable(
        &self,
        deliverable: &Deliverable,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        for rule in &self.rules {
            ctx.set_rule(rule.name);
            tracing::info!(rule = rule.name, "{}", rule.description);
            let before = ctx.errors().len();

            if let Err(e) = rule.run(deliverable, ctx) {
                ctx.error(format!("{} could not complete: {}", rule.name, e));
            }

            if ctx.debug() && ctx.errors().len() > before {
                let first = &ctx.errors()[before];
                return Err(ReleaseError::aborted(first.to_string()));
            }
        }
        Ok(())
    }

    /// Read and check one deliverable file
    pub fn validate_file(&self, path: &Path, ctx: &mut ValidationContext) -> Result<FileOutcome> {
        if !path.is_file() {
            tracing::info!("File was deleted, skipping.");
            return Ok(FileOutcome::Deleted);
        }
        ctx.set_filename(path.display().to_string());
        ctx.set_rule("read-file");

        let deliverable = match Deliverable::read_file(path) {
            Ok(deliverable) => deliverable,
            Err(e) if ctx.debug() => return Err(e),
            Err(e) => {
                ctx.error(format!("could not read deliverable: {}", e));
                return Ok(FileOutcome::Checked);
            }
        };

        if self.is_closed(deliverable.series()) {
            tracing::info!("File is part of a closed series, skipping");
            return Ok(FileOutcome::ClosedSeries(deliverable.series().to_string()));
        }

        self.validate_deliverable(&deliverable, ctx)?;
        Ok(FileOutcome::Checked)
    }
}

/// Everything recorded during a run
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<Finding>,
    pub errors: Vec<Finding>,
}

impl ValidationReport {
    pub fn from_context(ctx: &ValidationContext) -> Self {
        ValidationReport {
            warnings: ctx.warnings().to_vec(),
            errors: ctx.errors().to_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}
