//! The ordered rule list
//!
//! Rules run in the order [`default_rules`] returns them. Each rule lives
//! in the module for its family and records findings on the context.

mod branches;
mod lifecycle;
mod metadata;
mod series;
mod tags;
mod versions;

use crate::error::Result;
use crate::git::GitOps;
use crate::validate::predicate::Condition::*;
use crate::validate::rule::Rule;
use regex::Regex;

/// Whether `value` looks like a full SHA-1
pub(crate) fn is_a_hash(value: &str) -> bool {
    Regex::new(r"(?i)^[a-f0-9]{40}$")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Whether `sha` is on `stable/<series>`, or on master while that branch
/// does not exist yet
pub(crate) fn check_branch_sha(git: &dyn GitOps, repo: &str, series: &str, sha: &str) -> Result<bool> {
    let stable = format!("stable/{}", series);
    let containing = git.branches_containing(repo, sha)?;
    if containing.contains(&stable) {
        return Ok(true);
    }
    if !git.branch_exists(repo, &stable)? && containing.contains("master") {
        tracing::debug!(repo, sha, "{} does not exist, found on master", stable);
        return Ok(true);
    }
    Ok(false)
}

pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "clone-deliverable",
            "Every repository of the deliverable can be checked out",
            metadata::clone_deliverable,
        ),
        Rule::new(
            "team",
            "Look for the team name in the governance data",
            metadata::validate_team,
        ),
        Rule::new(
            "release-model",
            "Require a valid release model",
            metadata::validate_model,
        ),
        Rule::new(
            "deliverable-type",
            "Require a known deliverable type and link mode",
            metadata::validate_type,
        ),
        Rule::new(
            "release-jobs",
            "Does the most recent release have the jobs for its release type?",
            tags::validate_release_jobs,
        )
        .when(HasReleases)
        .when(HasNewTag),
        Rule::new(
            "gitreview",
            "All repos must include a .gitreview file for new releases",
            tags::validate_gitreview,
        )
        .when(HasNewTag),
        Rule::new(
            "release-sha-exists",
            "Ensure the hashes for each release exist",
            tags::validate_release_sha_exists,
        )
        .when(HasReleases),
        Rule::new(
            "existing-tags",
            "Ensure tags that exist point to the SHAs listed",
            tags::validate_existing_tags,
        )
        .when(HasReleases),
        Rule::new(
            "version-numbers",
            "Ensure the version numbers are valid",
            versions::validate_version_numbers,
        )
        .when(HasNewTag),
        Rule::new(
            "version-ordering",
            "Versions must not decrease",
            versions::validate_version_ordering,
        )
        .when(HasReleases),
        Rule::new(
            "pre-release-progression",
            "Pre-releases must go alpha, beta, rc, final",
            versions::validate_pre_release_progression,
        )
        .when(SkipEolEm)
        .when(HasReleases)
        .when(CycleBased)
        .when(HasNewTag),
        Rule::new(
            "new-releases-at-end",
            "New releases must be added to the end of the list",
            versions::validate_new_releases_at_end,
        )
        .when(HasNewTag),
        Rule::new(
            "branch-membership",
            "Commits being tagged need to be on the right branch",
            versions::validate_branch_membership,
        )
        .when(HasNewTag),
        Rule::new(
            "tarball-base",
            "Does tarball-base match the name of the sdist?",
            tags::validate_tarball_base,
        )
        .when(HasReleases),
        Rule::new(
            "repository-set",
            "The newest release covers the expected repositories",
            series::validate_repository_set,
        )
        .when(CurrentSeries)
        .when(HasReleases)
        .when(SkipEolEm),
        Rule::new(
            "series-open",
            "No releases in the new series until the previous one has a branch",
            series::validate_series_open,
        )
        .when(CurrentSeries)
        .when(HasReleases)
        .when(CycleBased),
        Rule::new(
            "series-first",
            "The first release in a series needs to end with '.0'",
            series::validate_series_first,
        )
        .when(SkipEolEm)
        .when(CycleBased),
        Rule::new(
            "series-status",
            "The series still accepts releases",
            series::validate_series_status,
        )
        .when(HasReleases)
        .when(HasNewTag),
        Rule::new(
            "no-release-after-eol",
            "Nothing may be released after end of life",
            lifecycle::validate_no_release_after_eol,
        )
        .when(HasReleases),
        Rule::new(
            "eol-em-repositories",
            "EOL and EM tags cover every repository",
            lifecycle::validate_eol_em_repositories,
        )
        .when(HasReleases)
        .when(HasNewTag),
        Rule::new(
            "em-hashes",
            "EM tags reuse the commits of the last release",
            lifecycle::validate_em_hashes,
        )
        .when(HasReleases)
        .when(HasNewTag),
        Rule::new(
            "sentinel-series",
            "EOL, EM and last tags name their own series",
            lifecycle::validate_sentinel_series,
        )
        .when(HasReleases)
        .when(HasNewTag),
        Rule::new(
            "branch-prefixes",
            "Ensure all branch names have good prefixes",
            branches::validate_branch_prefixes,
        ),
        Rule::new(
            "stable-branches",
            "Apply the rules for stable branches",
            branches::validate_stable_branches,
        ),
        Rule::new(
            "feature-branches",
            "Apply the rules for feature branches",
            branches::validate_feature_branches,
        ),
        Rule::new(
            "bugfix-branches",
            "Apply the rules for bugfix branches",
            branches::validate_bugfix_branches,
        ),
        Rule::new(
            "branch-points",
            "Make sure the branch points given are on the expected branches",
            branches::validate_branch_points,
        ),
        Rule::new(
            "branch-point-order",
            "New releases must not predate the stable branch point",
            branches::validate_branch_point_order,
        )
        .when(CycleBased)
        .when(HasNewTag),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ci::StaticJobTemplates;
    use crate::domain::deliverable::{Deliverable, DeliverableIndex};
    use crate::domain::series::SeriesStatus;
    use crate::git::MockGit;
    use crate::governance::StaticGovernance;
    use crate::validate::context::{Collaborators, ValidationContext};

    pub const SHA_1: &str = "1111111111111111111111111111111111111111";
    pub const SHA_2: &str = "2222222222222222222222222222222222222222";
    pub const SHA_3: &str = "3333333333333333333333333333333333333333";

    pub fn context(git: MockGit) -> ValidationContext {
        context_with(git, StaticGovernance::new(), StaticJobTemplates::new())
    }

    pub fn context_with(
        git: MockGit,
        governance: StaticGovernance,
        jobs: StaticJobTemplates,
    ) -> ValidationContext {
        let mut ctx = ValidationContext::new(
            Collaborators::new(git, governance, jobs),
            SeriesStatus::default(),
            DeliverableIndex::default(),
            "2024.1",
        );
        ctx.set_filename("test.yaml");
        ctx
    }

    pub fn deliv(series: &str, yaml: &str) -> Deliverable {
        Deliverable::from_yaml_str(series, "demo", yaml).unwrap()
    }

    pub fn messages(ctx: &ValidationContext) -> Vec<String> {
        ctx.errors().iter().map(|f| f.message.clone()).collect()
    }

    pub fn warning_messages(ctx: &ValidationContext) -> Vec<String> {
        ctx.warnings().iter().map(|f| f.message.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rule_names_are_unique() {
        let rules = default_rules();
        let names: HashSet<&str> = rules.iter().map(|r| r.name).collect();
        assert_eq!(names.len(), rules.len());
        assert_eq!(rules.len(), 28);
        assert_eq!(rules[0].name, "clone-deliverable");
        assert_eq!(rules[13].name, "tarball-base");
        assert_eq!(rules[27].name, "branch-point-order");
    }

    #[test]
    fn test_is_a_hash() {
        assert!(is_a_hash("1111111111111111111111111111111111111111"));
        assert!(is_a_hash("ABCDEF1111111111111111111111111111111111"));
        assert!(!is_a_hash("1111"));
        assert!(!is_a_hash("g111111111111111111111111111111111111111"));
    }
}
