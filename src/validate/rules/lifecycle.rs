use crate::domain::deliverable::Deliverable;
use crate::error::Result;
use crate::validate::context::ValidationContext;
use std::collections::BTreeSet;

pub fn validate_no_release_after_eol(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let releases = deliv.releases();
    let eol = match releases.iter().position(|r| r.is_eol()) {
        Some(idx) => idx,
        None => return Ok(()),
    };
    for release in &releases[eol + 1..] {
        ctx.error(format!(
            "release {} is listed after the end-of-life tag {}",
            release.version, releases[eol].version
        ));
    }
    Ok(())
}

pub fn validate_eol_em_repositories(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let known = deliv.known_repo_names();
    let expected: BTreeSet<String> = deliv
        .repos()
        .filter(|r| known.contains(&r.name) && !r.is_retired())
        .map(|r| r.name.clone())
        .collect();

    for release in ctx.new_releases(deliv)? {
        if !(release.is_eol() || release.is_em()) {
            continue;
        }
        let tagged = release.repo_names();
        for missing in expected.difference(&tagged) {
            ctx.error(format!(
                "{} must be applied to every repository, {} is missing",
                release.version, missing
            ));
        }
        for extra in tagged.difference(&known) {
            ctx.error(format!(
                "{} is applied to {}, which is not in the repository-settings section",
                release.version, extra
            ));
        }
    }
    Ok(())
}

pub fn validate_em_hashes(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let releases = deliv.releases();
    for (idx, release) in releases.iter().enumerate() {
        if !release.is_em() || !ctx.is_new_release(release)? {
            continue;
        }
        let last = match releases[..idx].iter().rev().find(|r| !r.is_sentinel()) {
            Some(last) => last,
            None => {
                ctx.error(format!(
                    "{} has no earlier release to take its commits from",
                    release.version
                ));
                continue;
            }
        };
        for project in &release.projects {
            match last.project(&project.repo) {
                Some(previous) if previous.hash == project.hash => {}
                Some(previous) => ctx.error(format!(
                    "{} for {} is on {} but the last release {} is on {}",
                    release.version, project.repo, project.hash, last.version, previous.hash
                )),
                None => ctx.error(format!(
                    "{} tags {}, which was not part of the last release {}",
                    release.version, project.repo, last.version
                )),
            }
        }
    }
    Ok(())
}

pub fn validate_sentinel_series(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    for release in ctx.new_releases(deliv)? {
        if let Some(tag) = release.sentinel() {
            if tag.series != deliv.series() {
                ctx.error(format!(
                    "{} does not match the series {} of this deliverable",
                    release.version,
                    deliv.series()
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

    fn with_repos(repos: &[&str], releases: &[(&str, &[(&str, &str)])]) -> String {
        let mut yaml = String::from("release-model: cycle-with-rc\nrepository-settings:\n");
        for repo in repos {
            yaml.push_str(&format!("  {}: {{}}\n", repo));
        }
        yaml.push_str("releases:\n");
        for (version, projects) in releases {
            yaml.push_str(&format!("  - version: {}\n    projects:\n", version));
            for (repo, hash) in projects.iter() {
                yaml.push_str(&format!("      - repo: {}\n        hash: {}\n", repo, hash));
            }
        }
        yaml
    }

    fn tagged_git() -> MockGit {
        let mut git = MockGit::new();
        git.add_tag("openstack/a", "1.0.0", SHA_1);
        git.add_tag("openstack/b", "1.0.0", SHA_2);
        git
    }

    #[test]
    fn test_eol_covers_declared_repos() {
        let repos = ["openstack/a", "openstack/b"];
        let first: &[(&str, &str)] = &[("openstack/a", SHA_1), ("openstack/b", SHA_2)];

        let mut ctx = context(tagged_git());
        let exact = with_repos(&repos, &[("1.0.0", first), ("2023.1-eol", first)]);
        validate_eol_em_repositories(&deliv("2023.1", &exact), &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());

        let mut ctx = context(tagged_git());
        let subset = with_repos(
            &repos,
            &[("1.0.0", first), ("2023.1-eol", &[("openstack/a", SHA_1)])],
        );
        validate_eol_em_repositories(&deliv("2023.1", &subset), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);

        let mut ctx = context(tagged_git());
        let extra = with_repos(
            &repos,
            &[
                ("1.0.0", first),
                (
                    "2023.1-eol",
                    &[("openstack/a", SHA_1), ("openstack/b", SHA_2), ("openstack/c", SHA_3)],
                ),
            ],
        );
        validate_eol_em_repositories(&deliv("2023.1", &extra), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_em_hashes() {
        let repos = ["openstack/a", "openstack/b"];
        let first: &[(&str, &str)] = &[("openstack/a", SHA_1), ("openstack/b", SHA_2)];

        let mut ctx = context(tagged_git());
        let same = with_repos(&repos, &[("1.0.0", first), ("2023.1-em", first)]);
        validate_em_hashes(&deliv("2023.1", &same), &mut ctx).unwrap();
        assert!(ctx.errors().is_empty());

        let moved = with_repos(
            &repos,
            &[
                ("1.0.0", first),
                ("2023.1-em", &[("openstack/a", SHA_3), ("openstack/b", SHA_2)]),
            ],
        );
        validate_em_hashes(&deliv("2023.1", &moved), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
        assert!(messages(&ctx)[0].contains("the last release 1.0.0"));
    }

    #[test]
    fn test_no_release_after_eol() {
        let mut ctx = context(MockGit::new());
        let only: &[(&str, &str)] = &[("openstack/a", SHA_1)];
        let yaml = with_repos(
            &["openstack/a"],
            &[("1.0.0", only), ("2023.1-eol", only), ("1.0.1", only)],
        );
        validate_no_release_after_eol(&deliv("2023.1", &yaml), &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec!["release 1.0.1 is listed after the end-of-life tag 2023.1-eol".to_string()]
        );
    }

    #[test]
    fn test_sentinel_series() {
        let mut ctx = context(MockGit::new());
        let only: &[(&str, &str)] = &[("openstack/a", SHA_1)];
        let yaml = with_repos(&["openstack/a"], &[("1.0.0", only), ("2023.2-eol", only)]);
        validate_sentinel_series(&deliv("2023.1", &yaml), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
    }
}
