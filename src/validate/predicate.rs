use crate::domain::deliverable::Deliverable;
use crate::error::Result;
use crate::validate::context::ValidationContext;
use std::fmt;

/// Applicability test a rule can be gated on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Only the series under development
    CurrentSeries,
    /// At least one release is listed
    HasReleases,
    /// Not independent, abandoned or untagged
    CycleBased,
    /// Some release is not yet tagged upstream
    HasNewTag,
    /// The newest release is not an EOL or EM tag
    SkipEolEm,
}

impl Condition {
    pub fn name(&self) -> &'static str {
        match self {
            Condition::CurrentSeries => "current-series",
            Condition::HasReleases => "has-releases",
            Condition::CycleBased => "cycle-based",
            Condition::HasNewTag => "has-new-tag",
            Condition::SkipEolEm => "skip-eol-em",
        }
    }

    /// `Ok(Some(reason))` when the rule should be skipped
    pub fn evaluate(
        &self,
        deliverable: &Deliverable,
        ctx: &mut ValidationContext,
    ) -> Result<Option<String>> {
        let skip = match self {
            Condition::CurrentSeries => {
                if deliverable.series() != ctx.current_series() {
                    Some(format!(
                        "this rule only applies to the most current series ({}), skipping",
                        ctx.current_series()
                    ))
                } else {
                    None
                }
            }
            Condition::HasReleases => {
                if deliverable.is_released() {
                    None
                } else {
                    Some("no releases, skipping".to_string())
                }
            }
            Condition::CycleBased => {
                if deliverable.is_cycle_based() {
                    None
                } else {
                    Some(format!(
                        "rule does not apply to {} deliverables",
                        deliverable.model()
                    ))
                }
            }
            Condition::HasNewTag => {
                if ctx.has_new_release(deliverable)? {
                    None
                } else {
                    Some("all releases are already tagged, skipping".to_string())
                }
            }
            Condition::SkipEolEm => match deliverable.latest_release() {
                Some(release) if release.is_eol() || release.is_em() => Some(format!(
                    "{} is an EOL or EM tag, checked by dedicated rules",
                    release.version
                )),
                _ => None,
            },
        };
        Ok(skip)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
