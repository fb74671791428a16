use crate::ci::{expected_release_jobs, resolve_release_type, unexpected_release_jobs};
use crate::domain::deliverable::Deliverable;
use crate::error::Result;
use crate::git::GitOps;
use crate::validate::context::ValidationContext;
use crate::validate::rules::is_a_hash;
use std::collections::{BTreeMap, BTreeSet};

pub fn validate_release_jobs(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if deliv.artifact_link_mode() == "none" {
        tracing::info!("link-mode is \"none\", skipping release-type checks");
        return Ok(());
    }
    let release = match deliv.latest_release() {
        Some(release) => release,
        None => return Ok(()),
    };

    for project in &release.projects {
        if ctx.tag_exists(&project.repo, &release.version)? {
            tracing::debug!("{} already has {}", project.repo, release.version);
            continue;
        }
        if let Some(repo) = deliv.get_repo(&project.repo) {
            if repo.no_artifact_build_job() || repo.is_retired() {
                tracing::debug!("{} needs no release job, skipping", repo.name);
                continue;
            }
        }

        let (release_type, explicit) =
            resolve_release_type(deliv, &project.repo, &project.hash, ctx.git())?;
        tracing::debug!(explicit, "release-type for {} is {}", project.repo, release_type);

        let expected = expected_release_jobs(&release_type);
        if expected.is_empty() {
            tracing::debug!("no expected jobs for release type {}, skipping", release_type);
            continue;
        }

        let templates = match ctx.jobs().release_job_templates(&project.repo) {
            Ok(templates) => templates.unwrap_or_default(),
            Err(e) => {
                ctx.warning(format!(
                    "could not verify release jobs for {}: {}",
                    project.repo, e
                ));
                continue;
            }
        };

        let found: Vec<&String> = templates
            .iter()
            .filter(|t| expected.contains(&t.as_str()))
            .collect();
        match found.len() {
            0 => ctx.error(format!(
                "no release job specified for {}, one of {:?} needs to be included in {:?} \
                 or no release will be published",
                project.repo, expected, templates
            )),
            1 => tracing::info!("found release job {} for {}", found[0], project.repo),
            _ => ctx.warning(format!(
                "multiple release jobs specified for {}, {:?} should include *one* of {:?}, \
                 found {:?}",
                project.repo, templates, expected, found
            )),
        }

        let mut wrong: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (job, other_type) in unexpected_release_jobs(&release_type, &templates) {
            wrong.entry(other_type).or_default().push(job);
        }
        for (other_type, jobs) in wrong {
            ctx.error(format!(
                "unexpected release jobs {:?} for release-type {} but {} uses release-type {}",
                jobs, other_type, project.repo, release_type
            ));
        }
    }
    Ok(())
}

pub fn validate_gitreview(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    let mut checked = BTreeSet::new();
    for release in deliv.releases() {
        for project in &release.projects {
            if !checked.insert(project.repo.clone()) {
                continue;
            }
            if deliv.get_repo(&project.repo).map(|r| r.is_retired()).unwrap_or(false) {
                tracing::info!("{} is retired, skipping", project.repo);
                continue;
            }
            if ctx.tag_exists(&project.repo, &release.version)? {
                tracing::debug!("version {} exists, skipping", release.version);
                continue;
            }
            let found = ctx
                .git()
                .file_exists(&project.repo, &project.hash, ".gitreview")?;
            if !found {
                ctx.error(format!("{} has no .gitreview file", project.repo));
            }
        }
    }
    Ok(())
}

pub fn validate_release_sha_exists(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    for release in deliv.releases() {
        tracing::debug!("checking {}", release.version);
        for project in &release.projects {
            if !is_a_hash(&project.hash) {
                ctx.error(format!(
                    "{} version {} release from {:?}, which is not a hash",
                    project.repo, release.version, project.hash
                ));
                continue;
            }
            let exists = ctx.git().commit_exists(&project.repo, &project.hash)?;
            if !exists {
                ctx.error(format!("No commit {:?} in {:?}", project.hash, project.repo));
            }
        }
    }
    Ok(())
}

pub fn validate_existing_tags(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    for release in deliv.releases() {
        for project in &release.projects {
            if !ctx.tag_exists(&project.repo, &release.version)? {
                tracing::debug!(
                    "{} does not have {} tag yet, skipping",
                    project.repo,
                    release.version
                );
                continue;
            }
            let actual = ctx.git().sha_for_tag(&project.repo, &release.version)?;
            if actual.as_deref() != Some(project.hash.as_str()) {
                ctx.error(format!(
                    "Version {} in {} is on commit {} instead of {}",
                    release.version,
                    project.repo,
                    actual.as_deref().unwrap_or("(unknown)"),
                    project.hash
                ));
            }
        }
    }
    Ok(())
}

/// Name a python project builds, read from its `setup.cfg`
enum SdistName {
    NotPython,
    Found(String),
    Unknown(String),
}

/// `name` in the `[metadata]` section of a setup.cfg
pub(crate) fn setup_cfg_name(content: &str) -> Option<String> {
    let mut in_metadata = false;
    for line in content.lines().map(str::trim) {
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_metadata = section.trim() == "metadata";
            continue;
        }
        if !in_metadata || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=').or_else(|| line.split_once(':')) {
            if key.trim() == "name" && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

fn read_sdist_name(git: &dyn GitOps, repo: &str, hash: &str) -> Result<SdistName> {
    if !git.file_exists(repo, hash, "setup.py")? {
        return Ok(SdistName::NotPython);
    }
    match git.read_file(repo, hash, "setup.cfg")? {
        Some(content) => Ok(setup_cfg_name(&content)
            .map(SdistName::Found)
            .unwrap_or_else(|| SdistName::Unknown("setup.cfg has no [metadata] name".into()))),
        None => Ok(SdistName::Unknown("there is no setup.cfg".into())),
    }
}

pub fn validate_tarball_base(deliv: &Deliverable, ctx: &mut ValidationContext) -> Result<()> {
    if deliv.artifact_link_mode() != "tarball" {
        tracing::info!(
            "rule does not apply for link-mode {}, skipping",
            deliv.artifact_link_mode()
        );
        return Ok(());
    }
    let release = match deliv.latest_release() {
        Some(release) => release,
        None => return Ok(()),
    };

    for project in &release.projects {
        let version_exists = ctx.tag_exists(&project.repo, &release.version)?;
        let sdist = match read_sdist_name(ctx.git(), &project.repo, &project.hash)? {
            SdistName::NotPython => {
                tracing::debug!("{} is not a python project, skipping", project.repo);
                continue;
            }
            SdistName::Found(name) => name,
            SdistName::Unknown(reason) => {
                let msg = format!(
                    "Could not get the name of {} for version {}: {}",
                    project.repo, release.version, reason
                );
                // an already tagged release must not block new ones
                if version_exists {
                    ctx.warning(msg);
                } else {
                    ctx.error(msg);
                }
                continue;
            }
        };

        let (expected, configured) = deliv.expected_sdist_name(project);
        if sdist != expected {
            let action = if configured { "is set to" } else { "defaults to" };
            ctx.error(format!(
                "tarball-base for {} {} {} {:?} but the sdist name is actually {:?}",
                project.repo, release.version, action, expected, sdist
            ));
        } else {
            tracing::info!("{:?} matches expected {:?}", sdist, expected);
        }
    }
    Ok(())
}
