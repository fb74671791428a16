use crate::domain::deliverable::Deliverable;
use crate::error::Result;
use crate::validate::context::ValidationContext;
use crate::validate::predicate::Condition;

/// Body of a rule
///
/// Violations are recorded on the context; `Err` means the rule could not
/// finish, typically because a collaborator failed.
pub type CheckFn = fn(&Deliverable, &mut ValidationContext) -> Result<()>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Skipped(String),
    Ran,
}

/// A named check and the conditions gating it
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    pub description: &'static str,
    pub conditions: Vec<Condition>,
    check: CheckFn,
}

impl Rule {
    pub fn new(name: &'static str, description: &'static str, check: CheckFn) -> Self {
        Rule {
            name,
            description,
            conditions: Vec::new(),
            check,
        }
    }

    /// Add a condition; conditions are evaluated in the order added
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Reason the rule does not apply, from the first failing condition
    pub fn skip_reason(
        &self,
        deliverable: &Deliverable,
        ctx: &mut ValidationContext,
    ) -> Result<Option<String>> {
        for condition in &self.conditions {
            if let Some(reason) = condition.evaluate(deliverable, ctx)? {
                return Ok(Some(reason));
            }
        }
        Ok(None)
    }

    pub fn run(&self, deliverable: &Deliverable, ctx: &mut ValidationContext) -> Result<RuleOutcome> {
        if let Some(reason) = self.skip_reason(deliverable, ctx)? {
            tracing::info!(rule = self.name, "{}", reason);
            return Ok(RuleOutcome::Skipped(reason));
        }
        (self.check)(deliverable, ctx)?;
        Ok(RuleOutcome::Ran)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("conditions", &self.conditions)
            .finish()
    }
}
