use crate::domain::deliverable::Deliverable;
use crate::domain::prerelease::PreRelease;
use crate::error::Result;
use crate::validate::context::ValidationContext;
use std::collections::BTreeSet;

pub fn validate_repository_set(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let release = match deliv.latest_release() {
        Some(release) => release,
        None => return Ok(()),
    };
    let actual = release.repo_names();

    match ctx.governance().resolve_repositories(deliv.name()) {
        Ok(expected) => {
            if deliv.artifact_link_mode() != "none" && expected.is_empty() {
                ctx.error(format!(
                    "unable to find deliverable {} in the governance list",
                    deliv.name()
                ));
            }
            for extra in actual.difference(&expected) {
                ctx.warning(format!(
                    "release {} includes repository {} that is not in the governance list",
                    release.version, extra
                ));
            }
            for missing in expected.difference(&actual) {
                ctx.warning(format!(
                    "release {} is missing {}, which appears in the governance list: {:?}",
                    release.version, missing, expected
                ));
            }
        }
        Err(e) => ctx.warning(format!(
            "could not verify the repositories of {} against governance: {}",
            deliv.name(),
            e
        )),
    }

    let known = deliv.known_repo_names();
    for repo in actual.difference(&known) {
        ctx.error(format!(
            "release {} includes repository {} that is not in the repository-settings section",
            release.version, repo
        ));
    }
    let active: BTreeSet<String> = deliv
        .repos()
        .filter(|r| known.contains(&r.name) && !r.is_retired())
        .map(|r| r.name.clone())
        .collect();
    for missing in active.difference(&actual) {
        ctx.warning(format!(
            "release {} is missing {}, which appears in the repository-settings list",
            release.version, missing
        ));
    }
    Ok(())
}

pub fn validate_series_open(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let previous = match ctx.index().previous_in_cycle(deliv.name(), deliv.series()) {
        Some(previous) => previous,
        None => {
            tracing::info!(
                "this is the first cycle-based version of this deliverable, skipping further checks"
            );
            return Ok(());
        }
    };

    let expected = format!("stable/{}", previous.series());
    if previous.get_branch_location(&expected).is_some() {
        tracing::info!("found branch {} in {}", expected, previous.filename());
        return Ok(());
    }
    let message = format!(
        "There is no {} branch defined in {}. Is the {} series open?",
        expected,
        previous.filename(),
        deliv.series()
    );
    ctx.warning(message);
    Ok(())
}

pub fn validate_series_first(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let first = match deliv.earliest_release() {
        Some(first) if deliv.is_first_release() => first,
        _ => {
            tracing::info!("this rule only applies to the first release in a series");
            return Ok(());
        }
    };

    let version = &first.version;
    let patchlevel = version.rsplit('.').next().unwrap_or_default();
    if !(patchlevel == "0" || PreRelease::parse(patchlevel).is_ok()) {
        ctx.error(format!(
            "Initial releases in a series must increment at least the minor version \
             or be pre-release versions. {:?}",
            version
        ));
    }
    Ok(())
}

pub fn validate_series_status(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    match deliv.allows_releases(ctx.series_status()) {
        Ok(true) => return Ok(()),
        Ok(false) => {}
        Err(e) => {
            ctx.error(format!("invalid stable-status: {}", e));
            return Ok(());
        }
    }
    let status = deliv.stable_status(ctx.series_status())?;

    for release in ctx.new_releases(deliv)? {
        if release.is_sentinel() {
            continue;
        }
        ctx.error(format!(
            "new release {} is not allowed, {} is in {} status",
            release.version,
            deliv.series(),
            status
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::StaticJobTemplates;
    use crate::domain::deliverable::DeliverableIndex;
    use crate::domain::series::{SeriesInfo, SeriesStatus, StableStatus};
    use crate::git::MockGit;
    use crate::governance::StaticGovernance;
    use crate::validate::context::Collaborators;
    use crate::validate::rules::test_support::*;

    const TWO_REPOS: &str = r#"
release-model: cycle-with-rc
repository-settings:
  openstack/demo: {}
  openstack/demo-ui: {}
releases:
  - version: 1.0.0
    projects:
      - repo: openstack/demo
        hash: 1111111111111111111111111111111111111111
      - repo: openstack/other
        hash: 1111111111111111111111111111111111111111
"#;

    #[test]
    fn test_repository_set() {
        let mut governance = StaticGovernance::new();
        governance.add_deliverable("demo", ["openstack/demo", "openstack/demo-ui"]);
        let mut ctx = context_with(MockGit::new(), governance, StaticJobTemplates::new());

        validate_repository_set(&deliv("2024.1", TWO_REPOS), &mut ctx).unwrap();
        assert_eq!(
            messages(&ctx),
            vec![
                "release 1.0.0 includes repository openstack/other that is not in the \
                 repository-settings section"
                    .to_string()
            ]
        );
        // extra and missing against governance, missing against settings
        assert_eq!(ctx.warnings().len(), 3);
    }

    #[test]
    fn test_repository_set_unknown_to_governance() {
        let mut ctx = context(MockGit::new());
        validate_repository_set(&deliv("2024.1", TWO_REPOS), &mut ctx).unwrap();
        assert!(messages(&ctx)
            .iter()
            .any(|m| m == "unable to find deliverable demo in the governance list"));
    }

    fn index_context(deliverables: Vec<crate::domain::deliverable::Deliverable>) -> ValidationContext {
        ValidationContext::new(
            Collaborators::new(MockGit::new(), StaticGovernance::new(), StaticJobTemplates::new()),
            SeriesStatus::default(),
            DeliverableIndex::from_deliverables(deliverables),
            "2024.1",
        )
    }

    #[test]
    fn test_series_open() {
        let previous = deliv("2023.2", "release-model: cycle-with-rc\n");
        let current = deliv("2024.1", TWO_REPOS);
        let mut ctx = index_context(vec![previous, current.clone()]);
        validate_series_open(&current, &mut ctx).unwrap();
        assert_eq!(
            warning_messages(&ctx),
            vec![
                "There is no stable/2023.2 branch defined in 2023.2/demo.yaml. Is the 2024.1 series open?"
                    .to_string()
            ]
        );

        let branched = deliv(
            "2023.2",
            "release-model: cycle-with-rc\nbranches:\n  - name: stable/2023.2\n    location: 0.9.0\n",
        );
        let mut ctx = index_context(vec![branched, current.clone()]);
        validate_series_open(&current, &mut ctx).unwrap();
        assert!(ctx.warnings().is_empty());

        let mut ctx = index_context(vec![current.clone()]);
        validate_series_open(&current, &mut ctx).unwrap();
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_series_first() {
        let mut ctx = context(MockGit::new());
        for version in ["2.0.0", "2.0.0.0b1", "2.0.0.0rc1"] {
            let yaml = format!("releases:\n  - version: {}\n    projects: []\n", version);
            validate_series_first(&deliv("2024.1", &yaml), &mut ctx).unwrap();
        }
        assert!(ctx.errors().is_empty());

        let yaml = "releases:\n  - version: 2.0.1\n    projects: []\n";
        validate_series_first(&deliv("2024.1", yaml), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
    }

    #[test]
    fn test_series_status() {
        let status = SeriesStatus::from_entries(vec![SeriesInfo::new(
            "2023.1",
            StableStatus::Unmaintained,
        )]);
        let mut ctx = ValidationContext::new(
            Collaborators::new(MockGit::new(), StaticGovernance::new(), StaticJobTemplates::new()),
            status,
            DeliverableIndex::default(),
            "2024.1",
        );
        let yaml = "release-model: cycle-with-rc\nreleases:\n  - version: 1.0.1\n    projects:\n      - repo: openstack/demo\n        hash: 1111111111111111111111111111111111111111\n";
        validate_series_status(&deliv("2023.1", yaml), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);

        validate_series_status(&deliv("2024.1", yaml), &mut ctx).unwrap();
        assert_eq!(ctx.errors().len(), 1);
    }
}
