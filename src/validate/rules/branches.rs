use crate::domain::branch::{Branch, BranchLocation, BranchPrefix, StableBranchType};
use crate::domain::deliverable::Deliverable;
use crate::domain::series::INDEPENDENT;
use crate::domain::version::compare_versions;
use crate::error::Result;
use crate::validate::context::ValidationContext;
use crate::validate::rules::is_a_hash;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

pub fn validate_branch_prefixes(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    for branch in deliv.branches() {
        if !branch.prefix().is_valid() {
            ctx.error(format!(
                "branch name {} does not use a valid prefix: stable, feature, bugfix",
                branch.name
            ));
        }
    }
    Ok(())
}

/// Branches with `prefix`, reporting names that do not split into
/// `prefix/identifier`
fn branches_of<'d>(
    deliv: &'d Deliverable,
    prefix: BranchPrefix,
    ctx: &mut ValidationContext,
) -> Vec<(&'d Branch, &'d str)> {
    let mut found = Vec::new();
    for branch in deliv.branches() {
        if branch.prefix() != prefix {
            continue;
        }
        match branch.split_name() {
            Some((_, identifier)) => found.push((branch, identifier)),
            None => ctx.error(format!(
                "{} branch name expected to be {}/name but got {}",
                prefix, prefix, branch.name
            )),
        }
    }
    found
}

fn check_commit_map(
    kind: &str,
    branch: &Branch,
    commits: &BTreeMap<String, String>,
    ctx: &mut ValidationContext,
) -> Result<()> {
    for (repo, location) in commits {
        if !is_a_hash(location) {
            ctx.error(format!(
                "{} branches should be created from commits by SHA but location {} \
                 for branch {} of {} does not look like a SHA",
                kind, location, repo, branch.name
            ));
            continue;
        }
        if !ctx.git().commit_exists(repo, location)? {
            ctx.error(format!(
                "{} branches should be created from merged commits but location {} \
                 for branch {} of {} does not exist",
                kind, location, repo, branch.name
            ));
        }
    }
    Ok(())
}

pub fn validate_stable_branches(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if deliv.deliverable_type() == "tempest-plugin" && !deliv.branches().is_empty() {
        ctx.error("Tempest plugins do not support branching.");
        return Ok(());
    }

    let mode = match deliv.stable_branch_type() {
        Ok(Some(mode)) => mode,
        Ok(None) => {
            if !deliv.branches().is_empty() {
                tracing::info!("stable-branch-type is none");
            }
            StableBranchType::Std
        }
        Err(e) => {
            ctx.error(e.to_string());
            return Ok(());
        }
    };
    let known_series: Vec<String> = ctx
        .index()
        .series_names()
        .into_iter()
        .filter(|s| s != INDEPENDENT)
        .collect();

    for (branch, series) in branches_of(deliv, BranchPrefix::Stable, ctx) {
        match (mode, &branch.location) {
            (StableBranchType::Std, BranchLocation::Version(version)) => {
                if deliv.get_release(version).is_none() {
                    ctx.error(format!(
                        "stable branches must be created from existing tagged releases, \
                         and {} for {} is not found in the list of releases for this deliverable",
                        version, branch.name
                    ));
                } else {
                    check_created_at_latest(deliv, branch, version, ctx)?;
                }
            }
            (StableBranchType::Tagless, BranchLocation::Commits(commits)) => {
                check_commit_map("tagless stable", branch, commits, ctx)?;
            }
            (StableBranchType::Upstream, BranchLocation::Version(_)) => {}
            (StableBranchType::Tagless, other) => ctx.error(format!(
                "branch location for {} is expected to be a mapping but got {}",
                branch.name,
                other.describe()
            )),
            (_, other) => ctx.error(format!(
                "branch location for {} is expected to be a string but got {}",
                branch.name,
                other.describe()
            )),
        }

        if mode == StableBranchType::Upstream {
            ctx.warning("skipping branch name check for upstream mode");
        } else if deliv.is_independent() {
            if !known_series.iter().any(|s| s == series) {
                ctx.error(format!(
                    "stable branches must be named for known series but {} was not found in {:?}",
                    branch.name, known_series
                ));
            }
        } else if series != deliv.series() {
            ctx.error(format!(
                "cycle-based projects must match series names for stable branches. \
                 {} should be stable/{}",
                branch.name,
                deliv.series()
            ));
        }
    }
    Ok(())
}

/// A stable branch that does not exist yet starts at the newest release
fn check_created_at_latest(
    deliv: &Deliverable,
    branch: &Branch,
    version: &str,
    ctx: &mut ValidationContext,
) -> Result<()> {
    let latest = match deliv.latest_ordinary_release() {
        Some(latest) => latest,
        None => return Ok(()),
    };
    if latest.version == version {
        return Ok(());
    }
    let repos = deliv.branch_repo_map(branch).unwrap_or_default();
    for repo in repos.keys() {
        if ctx.git().branch_exists(repo, &branch.name)? {
            tracing::debug!("{} already exists in {}", branch.name, repo);
            return Ok(());
        }
    }
    ctx.error(format!(
        "new branch {} should be created from the most recent release {} but uses {}",
        branch.name, latest.version, version
    ));
    Ok(())
}

pub fn validate_feature_branches(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if deliv.deliverable_type() == "tempest-plugin" {
        tracing::info!("branching is reported by the stable branch rule, skipping");
        return Ok(());
    }

    for (branch, _) in branches_of(deliv, BranchPrefix::Feature, ctx) {
        match &branch.location {
            BranchLocation::Commits(commits) => check_commit_map("feature", branch, commits, ctx)?,
            other => ctx.error(format!(
                "branch location for {} is expected to be a mapping but got {}",
                branch.name,
                other.describe()
            )),
        }
    }
    Ok(())
}

fn is_major_minor(value: &str) -> bool {
    Regex::new(r"^\d+\.\d+$")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

pub fn validate_bugfix_branches(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if deliv.deliverable_type() == "tempest-plugin" {
        tracing::info!("branching is reported by the stable branch rule, skipping");
        return Ok(());
    }

    for (branch, identifier) in branches_of(deliv, BranchPrefix::Bugfix, ctx) {
        if !is_major_minor(identifier) {
            ctx.error(format!(
                "bugfix branch name expected to be bugfix/X.Y but got {}",
                branch.name
            ));
            continue;
        }
        let version = match &branch.location {
            BranchLocation::Version(version) => version,
            other => {
                ctx.error(format!(
                    "branch location for {} is expected to be a string but got {}",
                    branch.name,
                    other.describe()
                ));
                continue;
            }
        };
        let series_prefix = format!("{}.", identifier);
        if deliv.get_release(version).is_none() || !version.starts_with(&series_prefix) {
            ctx.error(format!(
                "bugfix branches must be created from an existing {}.* release \
                 but {} uses {}",
                identifier, branch.name, version
            ));
        }
    }
    Ok(())
}

pub fn validate_branch_points(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    // an invalid type is reported by the stable branch rule
    if deliv.stable_branch_type().ok().flatten() == Some(StableBranchType::Upstream) {
        tracing::info!("this project follows upstream branching conventions, skipping");
        return Ok(());
    }

    for branch in deliv.branches() {
        tracing::debug!("checking branch {:?}", branch.name);
        let (prefix, series) = match branch.split_name() {
            Some(split) => split,
            None => {
                tracing::info!("could not parse the branch name, skipping");
                continue;
            }
        };
        let expected: BTreeSet<String> = match prefix {
            BranchPrefix::Feature => {
                tracing::info!("these rules do not apply to feature branches, skipping");
                continue;
            }
            BranchPrefix::Stable => ["master".to_string(), branch.name.clone()].into(),
            BranchPrefix::Bugfix => [branch.name.clone()].into(),
            BranchPrefix::Other(_) => [branch.name.clone(), format!("stable/{}", series)].into(),
        };

        let location = match deliv.branch_repo_map(branch) {
            Some(location) => location,
            None => {
                tracing::debug!("{} has no resolvable location, skipping", branch.name);
                continue;
            }
        };

        for (repo, hash) in &location {
            let containing = ctx.git().branches_containing(repo, hash)?;
            tracing::debug!("found {} on branches {:?} in {}", hash, containing, repo);

            for missing in expected.difference(&containing) {
                if !ctx.git().branch_exists(repo, missing)? {
                    tracing::info!("branch {} does not exist in {}, skipping", missing, repo);
                    continue;
                }
                if ctx.git().branch_exists(repo, &branch.name)? {
                    ctx.error(format!(
                        "{} branch exists in {} and does not seem to have been created from {}",
                        branch.name, repo, hash
                    ));
                } else {
                    ctx.error(format!(
                        "commit {} is not on the {} branch but it is listed as the branch \
                         point for {} to be created",
                        hash, missing, branch.name
                    ));
                }
            }
        }
    }
    Ok(())
}

pub fn validate_branch_point_order(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let name = format!("stable/{}", deliv.series());
    let branch_point = match deliv.get_branch_location(&name) {
        Some(BranchLocation::Version(version)) => version.clone(),
        _ => return Ok(()),
    };

    for release in ctx.new_releases(deliv)? {
        if release.is_sentinel() {
            continue;
        }
        if compare_versions(&release.version, &branch_point) == Some(Ordering::Less) {
            ctx.error(format!(
                "new release {} predates the {} branch point {}",
                release.version, name, branch_point
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::StaticJobTemplates;
    use crate::domain::deliverable::DeliverableIndex;
    use crate::domain::series::SeriesStatus;
    use crate::git::MockGit;
    use crate::governance::StaticGovernance;
    use crate::validate::context::Collaborators;
    use crate::validate::rules::test_support::*;

    fn released(extra: &str) -> String {
        format!(
            "release-model: cycle-with-rc\nreleases:\n  - version: 1.0.0\n    projects:\n      \
             - repo: openstack/demo\n        hash: {}\n  - version: 1.1.0\n    projects:\n      \
             - repo: openstack/demo\n        hash: {}\n{}",
            SHA_1, SHA_2, extra
        )
    }

    #[test]
    fn test_branch_prefixes() {
        let mut ctx = context(MockGit::new());
        let d = deliv(
            "2024.1",
            "branches:\n  - name: stable/2024.1\n    location: 1.0.0\n  - name: driverfixes/ocata\n    location: 1.0.0\n",
        );
        validate_branch_prefixes(&d, &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["branch name driverfixes/ocata does not use a valid prefix: stable, feature, bugfix"
                .to_string()]
        );
    }

    #[test]
    fn test_stable_branch_std() {
        let mut ctx = context(MockGit::new());
        let d = deliv("2024.1", &released("branches:\n  - name: stable/2024.1\n    location: 1.1.0\n"));
        validate_stable_branches(&d, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());

        let d = deliv("2024.1", &released("branches:\n  - name: stable/2024.1\n    location: 9.9.9\n"));
        validate_stable_branches(&d, &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
        assert!(messages(&ctx)[0].starts_with("stable branches must be created from existing"));
    }

    #[test]
    fn test_stable_branch_misnamed() {
        let mut ctx = context(MockGit::new());
        let d = deliv("2024.1", &released("branches:\n  - name: stable/2023.2\n    location: 1.1.0\n"));
        validate_stable_branches(&d, &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["cycle-based projects must match series names for stable branches. \
                  stable/2023.2 should be stable/2024.1"
                .to_string()]
        );
    }

    #[test]
    fn test_new_stable_branch_must_use_latest_release() {
        let mut ctx = context(MockGit::new());
        let d = deliv("2024.1", &released("branches:\n  - name: stable/2024.1\n    location: 1.0.0\n"));
        validate_stable_branches(&d, &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
        assert!(messages(&ctx)[0].contains("most recent release 1.1.0"));

        // an existing branch is not re-checked
        let mut git = MockGit::new();
        git.add_branch("openstack/demo", "stable/2024.1", &[SHA_1]);
        let mut ctx = context(git);
        validate_stable_branches(&d, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_stable_branch_tagless() {
        let mut git = MockGit::new();
        git.add_commit("openstack/demo", SHA_1);
        let mut ctx = context(git);
        let yaml = format!(
            "release-model: cycle-with-rc\nstable-branch-type: tagless\nbranches:\n  \
             - name: stable/2024.1\n    location:\n      openstack/demo: {}\n      openstack/demo-ui: master\n",
            SHA_1
        );
        validate_stable_branches(&deliv("2024.1", &yaml), &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].ends_with("does not look like a SHA"));
    }

    #[test]
    fn test_stable_branch_upstream_and_tempest() {
        let mut ctx = context(MockGit::new());
        let yaml = "release-model: cycle-with-rc\nstable-branch-type: upstream\nbranches:\n  \
                    - name: stable/v3\n    location: 3.0.0\n";
        validate_stable_branches(&deliv("2024.1", yaml), &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
        assert_eq!(
            warning_messages(&ctx),
            vec!["skipping branch name check for upstream mode".to_string()]
        );

        let yaml = "type: tempest-plugin\nbranches:\n  - name: stable/2024.1\n    location: 1.0.0\n";
        validate_stable_branches(&deliv("2024.1", yaml), &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["Tempest plugins do not support branching.".to_string()]
        );
    }

    #[test]
    fn test_stable_branch_independent_series() {
        let known = deliv("2023.2", "release-model: cycle-with-rc\n");
        let mut ctx = ValidationContext::new(
            Collaborators::new(MockGit::new(), StaticGovernance::new(), StaticJobTemplates::new()),
            SeriesStatus::default(),
            DeliverableIndex::from_deliverables(vec![known]),
            "2024.1",
        );
        let yaml = format!(
            "{}branches:\n  - name: stable/2023.2\n    location: 1.1.0\n  - name: stable/nowhere\n    location: 1.1.0\n",
            released("").replace("cycle-with-rc", "independent")
        );
        validate_stable_branches(&deliv("independent", &yaml), &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("stable branches must be named for known series but stable/nowhere"));
    }

    #[test]
    fn test_feature_branches() {
        let mut git = MockGit::new();
        git.add_commit("openstack/demo", SHA_1);
        let mut ctx = context(git);
        let yaml = format!(
            "branches:\n  - name: feature/shiny\n    location:\n      openstack/demo: {}\n  \
             - name: feature/gone\n    location:\n      openstack/demo: {}\n  \
             - name: feature/flat\n    location: 1.0.0\n",
            SHA_1, SHA_2
        );
        validate_feature_branches(&deliv("2024.1", &yaml), &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("does not exist"));
        assert!(errors[1].contains("expected to be a mapping"));
    }

    #[test]
    fn test_bugfix_branches() {
        let mut ctx = context(MockGit::new());
        let d = deliv(
            "2024.1",
            &released("branches:\n  - name: bugfix/1.0\n    location: 1.0.0\n"),
        );
        validate_bugfix_branches(&d, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());

        let d = deliv(
            "2024.1",
            &released(
                "branches:\n  - name: bugfix/1.0\n    location: 1.1.0\n  - name: bugfix/next\n    location: 1.1.0\n",
            ),
        );
        validate_bugfix_branches(&d, &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("bugfix branches must be created from an existing 1.0.* release"));
        assert!(errors[1].contains("bugfix/X.Y"));
    }

    #[test]
    fn test_branch_point_not_on_master() {
        let mut git = MockGit::new();
        git.add_branch("openstack/demo", "master", &[SHA_1]);
        git.add_commit("openstack/demo", SHA_2);
        let mut ctx = context(git);
        let d = deliv("2024.1", &released("branches:\n  - name: stable/2024.1\n    location: 1.1.0\n"));
        validate_branch_points(&d, &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec![format!(
                "commit {} is not on the master branch but it is listed as the branch point \
                 for stable/2024.1 to be created",
                SHA_2
            )]
        );
    }

    #[test]
    fn test_branch_point_existing_branch() {
        let mut git = MockGit::new();
        git.add_branch("openstack/demo", "master", &[SHA_1, SHA_2]);
        git.add_branch("openstack/demo", "stable/2024.1", &[SHA_1, SHA_3]);
        let mut ctx = context(git);
        let d = deliv("2024.1", &released("branches:\n  - name: stable/2024.1\n    location: 1.1.0\n"));
        validate_branch_points(&d, &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec![format!(
                "stable/2024.1 branch exists in openstack/demo and does not seem to have been \
                 created from {}",
                SHA_2
            )]
        );

        let d = deliv("2024.1", &released("branches:\n  - name: stable/2024.1\n    location: 1.0.0\n"));
        let mut ctx = context({
            let mut git = MockGit::new();
            git.add_branch("openstack/demo", "master", &[SHA_1, SHA_2]);
            git.add_branch("openstack/demo", "stable/2024.1", &[SHA_1, SHA_3]);
            git
        });
        validate_branch_points(&d, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_branch_point_order() {
        let mut git = MockGit::new();
        git.add_tag("openstack/demo", "1.0.0", SHA_1);
        git.add_tag("openstack/demo", "1.1.0", SHA_2);
        let mut ctx = context(git);
        let yaml = format!(
            "{}  - version: 1.0.1\n    projects:\n      - repo: openstack/demo\n        hash: {}\n\
             branches:\n  - name: stable/2024.1\n    location: 1.1.0\n",
            released(""),
            SHA_3
        );
        validate_branch_point_order(&deliv("2024.1", &yaml), &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["new release 1.0.1 predates the stable/2024.1 branch point 1.1.0".to_string()]
        );
    }
}
