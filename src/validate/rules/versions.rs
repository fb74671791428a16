use crate::ci::resolve_release_type;
use crate::domain::deliverable::{Deliverable, ReleaseModel};
use crate::domain::version::{compare_versions, validate_version, Classification};
use crate::error::Result;
use crate::validate::context::ValidationContext;
use crate::validate::rules::check_branch_sha;
use std::cmp::Ordering;
use std::collections::HashMap;

pub fn validate_version_numbers(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let pre_release_allowed = deliv.model().allows_pre_releases();

    for release in deliv.releases() {
        if release.is_sentinel() {
            continue;
        }
        for project in &release.projects {
            if ctx.tag_exists(&project.repo, &release.version)? {
                continue;
            }
            tracing::debug!("found new version {} for {}", release.version, project.repo);

            let (release_type, _) =
                resolve_release_type(deliv, &project.repo, &project.hash, ctx.git())?;
            let violations = validate_version(&release.version, &release_type, pre_release_allowed);
            if violations.is_empty() {
                tracing::info!("{} for {} OK", release.version, project.repo);
            }
            for violation in violations {
                ctx.error(format!(
                    "could not validate version {:?}: {}",
                    release.version, violation
                ));
            }
        }
    }
    Ok(())
}

pub fn validate_version_ordering(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    for pair in deliv.releases().windows(2) {
        let (previous, current) = (&pair[0], &pair[1]);
        if compare_versions(&previous.version, &current.version) == Some(Ordering::Greater) {
            ctx.error(format!(
                "version {} is listed after {} but is lower",
                current.version, previous.version
            ));
        }
    }
    Ok(())
}

pub fn validate_pre_release_progression(
    deliv: &Deliverable,
    ctx: &mut ValidationContext,
) -> Result<()> {
    let mut previous: Option<(&str, Classification)> = None;

    for release in deliv.releases() {
        let current = release.classification();
        if current.is_sentinel() {
            continue;
        }
        let is_new = ctx.is_new_release(release)?;

        match previous {
            None => {
                if is_new
                    && deliv.model() == ReleaseModel::CycleWithRc
                    && current == Classification::Final
                {
                    ctx.error(format!(
                        "{} is the first release of a cycle-with-rc deliverable \
                         and must come after a release candidate",
                        release.version
                    ));
                }
            }
            Some((prev_version, prev_class)) if is_new => {
                let prev_rank = prev_class.progression_rank().unwrap_or(0);
                let rank = current.progression_rank().unwrap_or(0);
                if current == Classification::Final && prev_class.is_pre_release()
                    && prev_class != Classification::ReleaseCandidate
                {
                    ctx.error(format!(
                        "{} follows {} ({}) and must come after a release candidate",
                        release.version, prev_version, prev_class
                    ));
                } else if rank < prev_rank {
                    ctx.error(format!(
                        "{} ({}) cannot follow {} ({})",
                        release.version, current, prev_version, prev_class
                    ));
                }
            }
            Some(_) => {}
        }

        previous = Some((release.version.as_str(), current));
    }
    Ok(())
}

pub fn validate_new_releases_at_end(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let releases = deliv.releases();
    let last = releases.len().saturating_sub(1);
    for (idx, release) in releases.iter().enumerate() {
        if !ctx.is_new_release(release)? {
            continue;
        }
        if idx != last {
            ctx.error(format!(
                "new release {} must be listed last, with one new release per patch",
                release.version
            ));
        }
    }
    Ok(())
}

pub fn validate_branch_membership(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if deliv.is_independent() {
        ctx.warning("skipping descendant test for independent project, verify branch manually");
        return Ok(());
    }

    // previous version tagged in each repository
    let mut previous: HashMap<&str, &str> = HashMap::new();

    for release in deliv.releases() {
        for project in &release.projects {
            let prior = previous.insert(project.repo.as_str(), release.version.as_str());
            if ctx.tag_exists(&project.repo, &release.version)? {
                continue;
            }

            let on_branch = check_branch_sha(ctx.git(), &project.repo, deliv.series(), &project.hash)?;
            if !on_branch {
                ctx.error(format!(
                    "{} {} not present in {} branch",
                    project.repo,
                    project.hash,
                    deliv.series()
                ));
            }

            let prior = match prior {
                Some(prior) => prior,
                None => {
                    tracing::debug!("no ancestry check for first version in a series");
                    continue;
                }
            };

            let old_sha = ctx.git().sha_for_tag(&project.repo, prior)?;
            if old_sha.as_deref() == Some(project.hash.as_str()) {
                tracing::debug!("{} is being retagged with a new version", project.hash);
                continue;
            }
            let descendant = ctx.git().check_ancestry(&project.repo, prior, &project.hash)?;
            if !descendant {
                ctx.error(format!(
                    "{} {} receiving {} is not a descendant of {}",
                    project.repo, project.hash, release.version, prior
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockGit;
    use crate::validate::rules::test_support::*;

    fn releases(model: &str, versions: &[(&str, &str)]) -> String {
        let mut yaml = format!("release-model: {}\nreleases:\n", model);
        for (version, hash) in versions {
            yaml.push_str(&format!(
                "  - version: {}\n    projects:\n      - repo: openstack/demo\n        hash: {}\n",
                version, hash
            ));
        }
        yaml
    }

    #[test]
    fn test_version_numbers() {
        let mut ctx = context(MockGit::new());
        let d = deliv(
            "2024.1",
            &format!("type: library\n{}", releases("cycle-with-intermediary", &[("1.0.0.0rc1", SHA_1)])),
        );
        validate_version_numbers(&d, &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
        assert!(messages(&ctx)[0].starts_with("could not validate version \"1.0.0.0rc1\""));

        let mut ctx = context(MockGit::new());
        let d = deliv(
            "2024.1",
            &format!("type: library\n{}", releases("cycle-with-rc", &[("1.0.0.0rc1", SHA_1)])),
        );
        validate_version_numbers(&d, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_version_ordering() {
        let mut ctx = context(MockGit::new());
        let d = deliv(
            "2024.1",
            &releases(
                "cycle-with-rc",
                &[("1.1.0", SHA_1), ("1.0.0", SHA_2), ("2024.1-em", SHA_2), ("0.1.0", SHA_2)],
            ),
        );
        validate_version_ordering(&d, &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["version 1.0.0 is listed after 1.1.0 but is lower".to_string()]
        );
    }

    #[test]
    fn test_first_rc_release_is_accepted() {
        let mut ctx = context(MockGit::new());
        let d = deliv("2024.1", &releases("cycle-with-rc", &[("1.5.0.0rc1", SHA_1)]));
        validate_pre_release_progression(&d, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_first_final_release_needs_rc() {
        let mut ctx = context(MockGit::new());
        let d = deliv("2024.1", &releases("cycle-with-rc", &[("1.5.0", SHA_1)]));
        validate_pre_release_progression(&d, &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("must come after a release candidate"));
    }

    #[test]
    fn test_final_after_beta() {
        let mut ctx = context(MockGit::new());
        let d = deliv(
            "2024.1",
            &releases("cycle-with-milestones", &[("1.5.0.0b1", SHA_1), ("1.5.0", SHA_2)]),
        );
        validate_pre_release_progression(&d, &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_beta_after_rc() {
        let mut git = MockGit::new();
        git.add_tag("openstack/demo", "1.5.0.0rc1", SHA_1);
        let mut ctx = context(git);
        let d = deliv(
            "2024.1",
            &releases("cycle-with-milestones", &[("1.5.0.0rc1", SHA_1), ("1.5.0.0b3", SHA_2)]),
        );
        validate_pre_release_progression(&d, &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot follow 1.5.0.0rc1"));
    }

    #[test]
    fn test_new_releases_at_end() {
        let mut git = MockGit::new();
        git.add_tag("openstack/demo", "1.1.0", SHA_2);
        let mut ctx = context(git);
        let d = deliv(
            "2024.1",
            &releases("cycle-with-rc", &[("1.0.0", SHA_1), ("1.1.0", SHA_2), ("1.2.0", SHA_3)]),
        );
        validate_new_releases_at_end(&d, &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["new release 1.0.0 must be listed last, with one new release per patch".to_string()]
        );
    }

    #[test]
    fn test_branch_membership() {
        let mut git = MockGit::new();
        git.add_branch("openstack/demo", "master", &[SHA_1, SHA_2]);
        git.add_commit("openstack/demo", SHA_3);
        git.add_tag("openstack/demo", "1.0.0", SHA_1);

        let mut ctx = context(git);
        let good = deliv("2024.1", &releases("cycle-with-rc", &[("1.0.0", SHA_1), ("1.1.0", SHA_2)]));
        validate_branch_membership(&good, &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());

        let bad = deliv("2024.1", &releases("cycle-with-rc", &[("1.0.0", SHA_1), ("1.1.0", SHA_3)]));
        validate_branch_membership(&bad, &mut ctx).unwrap();
        let errors = messages(&ctx);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("not present in 2024.1 branch"));
        assert!(errors[1].ends_with("is not a descendant of 1.0.0"));
    }

    #[test]
    fn test_branch_membership_independent() {
        let mut ctx = context(MockGit::new());
        let d = deliv("independent", &releases("independent", &[("1.0.0", SHA_1)]));
        validate_branch_membership(&d, &mut ctx).unwrap();
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx.errors().is_empty());
    }
}
