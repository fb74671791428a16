use crate::domain::branch::{Branch, BranchLocation};
use crate::domain::deliverable::{Deliverable, DeliverableFile, ProjectData, ReleaseData};
use crate::domain::prerelease::PreRelease;
use crate::domain::tag::{SentinelKind, SentinelTag};
use crate::error::{ReleaseError, Result};
use crate::git::GitOps;
use crate::increment::version_increment::{
    find_last_release, increment_milestone_version, increment_version, LastRelease, ReleaseType,
};

/// One repository of a planned release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedProject {
    pub repo: String,
    pub hash: String,
    /// Hash tagged by the previous release, if the repo was part of it
    pub previous_hash: Option<String>,
}

impl PlannedProject {
    pub fn is_changed(&self) -> bool {
        self.previous_hash.as_deref() != Some(self.hash.as_str())
    }
}

/// Result of computing a new release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasePlan {
    pub series: String,
    pub deliverable: String,
    pub release_type: ReleaseType,
    pub previous_version: String,
    pub version: String,
    pub projects: Vec<PlannedProject>,
    /// Branch to append alongside the release
    pub branch: Option<Branch>,
    /// False when nothing moved since the previous release and the release
    /// was not forced
    pub has_changes: bool,
}

impl ReleasePlan {
    /// Append the planned release and branch to a deliverable file
    pub fn apply(&self, file: &mut DeliverableFile) {
        file.releases.push(ReleaseData {
            version: self.version.clone(),
            projects: self
                .projects
                .iter()
                .map(|p| ProjectData {
                    repo: p.repo.clone(),
                    hash: p.hash.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        });

        if let Some(branch) = &self.branch {
            if !file.branches.iter().any(|b| b.name == branch.name) {
                file.branches.push(branch.clone());
            }
        }
    }
}

/// Computes the next release of a deliverable
pub struct ReleasePlanner<'a> {
    git: &'a dyn GitOps,
    force: bool,
    stable_branch: bool,
}

impl<'a> ReleasePlanner<'a> {
    pub fn new(git: &'a dyn GitOps) -> Self {
        ReleasePlanner {
            git,
            force: false,
            stable_branch: false,
        }
    }

    /// Count the release as changed even if no commit moved
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Always add a stable branch at the new version
    pub fn stable_branch(mut self, stable_branch: bool) -> Self {
        self.stable_branch = stable_branch;
        self
    }

    /// Plan the next `release_type` release of a deliverable in `series`
    ///
    /// `history` holds every copy of the deliverable across series.
    pub fn plan(
        &self,
        history: &[&Deliverable],
        series: &str,
        release_type: ReleaseType,
    ) -> Result<ReleasePlan> {
        let target = history
            .iter()
            .copied()
            .find(|d| d.series() == series)
            .ok_or_else(|| {
                ReleaseError::increment(format!("no deliverable file for series {}", series))
            })?;

        if release_type.is_pre_release() && !target.is_milestone_based() {
            return Err(ReleaseError::increment(format!(
                "Cannot compute {} for {} project {}",
                release_type,
                target.model(),
                target.name()
            )));
        }

        let last = find_last_release(history, series, release_type)?;
        if let Some(eol) = last.sentinel.as_ref().filter(|r| r.is_eol()) {
            return Err(ReleaseError::increment(format!(
                "{} is already end of life ({}), no further releases are allowed",
                target.name(),
                eol.version
            )));
        }

        let version = next_version(&last, series, release_type)?;
        tracing::info!(
            previous = %last.release.version,
            new = %version,
            depth = last.depth,
            "computed new version"
        );

        let projects = self.plan_projects(target, &last, series, release_type)?;
        let has_changes = self.force
            || release_type.reuses_previous_commits()
            || release_type.is_pre_release()
            || projects.iter().any(PlannedProject::is_changed);

        let branch = self.plan_branch(target, &projects, series, release_type, &version)?;

        Ok(ReleasePlan {
            series: series.to_string(),
            deliverable: target.name().to_string(),
            release_type,
            previous_version: last.release.version.clone(),
            version,
            projects,
            branch,
            has_changes,
        })
    }

    fn plan_projects(
        &self,
        target: &Deliverable,
        last: &LastRelease,
        series: &str,
        release_type: ReleaseType,
    ) -> Result<Vec<PlannedProject>> {
        let mut repos: Vec<String> = target
            .repos()
            .filter(|r| !r.is_retired())
            .map(|r| r.name.clone())
            .collect();
        if repos.is_empty() {
            repos = last.release.repo_names().into_iter().collect();
        }

        let mut projects = Vec::with_capacity(repos.len());
        for repo in repos {
            let previous_hash = last.release.project(&repo).map(|p| p.hash.clone());

            let hash = if release_type.reuses_previous_commits() {
                previous_hash.clone().ok_or_else(|| {
                    ReleaseError::increment(format!(
                        "{} was not part of {}, cannot re-tag it",
                        repo, last.release.version
                    ))
                })?
            } else {
                let branch = self.tip_branch(&repo, series)?;
                self.git.sha_for_tag(&repo, &branch)?.ok_or_else(|| {
                    ReleaseError::increment(format!("could not resolve {} in {}", branch, repo))
                })?
            };

            tracing::debug!(repo = %repo, hash = %hash, "planned project");
            projects.push(PlannedProject {
                repo,
                hash,
                previous_hash,
            });
        }
        Ok(projects)
    }

    /// `origin/stable/<series>` when the branch exists, `master` otherwise
    fn tip_branch(&self, repo: &str, series: &str) -> Result<String> {
        let stable = format!("stable/{}", series);
        if self.git.branch_exists(repo, &stable)? {
            Ok(format!("origin/{}", stable))
        } else {
            Ok("master".to_string())
        }
    }

    fn plan_branch(
        &self,
        target: &Deliverable,
        projects: &[PlannedProject],
        series: &str,
        release_type: ReleaseType,
        version: &str,
    ) -> Result<Option<Branch>> {
        let name = format!("stable/{}", series);
        if target.get_branch_location(&name).is_some() {
            return Ok(None);
        }

        let first_rc = release_type == ReleaseType::Rc
            && version
                .rsplit('.')
                .next()
                .and_then(|last| PreRelease::parse(last).ok())
                .map(|pre| pre.number == 1)
                .unwrap_or(false);

        let wanted = self.stable_branch || (first_rc && !target.is_independent());
        if !wanted {
            return Ok(None);
        }

        for project in projects {
            if self.git.branch_exists(&project.repo, &name)? {
                tracing::info!(repo = %project.repo, branch = %name, "branch already exists");
                return Ok(None);
            }
        }

        Ok(Some(Branch::new(name, BranchLocation::Version(version.to_string()))))
    }
}

fn next_version(last: &LastRelease, series: &str, release_type: ReleaseType) -> Result<String> {
    let parts = last.version_parts();
    let feature_increment = last.feature_increment();
    let on_pre_release = last.release.is_pre_release();

    let new_parts = match release_type {
        ReleaseType::Bugfix | ReleaseType::Releasefix => increment_version(&parts, (0, 0, 1))?,
        ReleaseType::Feature | ReleaseType::Procedural => {
            increment_version(&parts, (0, feature_increment, 0))?
        }
        ReleaseType::Major => increment_version(&parts, (1, 0, 0))?,
        ReleaseType::Milestone if on_pre_release => {
            increment_milestone_version(&parts, release_type)?
        }
        ReleaseType::Milestone => {
            let bumped = increment_version(&parts, (0, feature_increment, 0))?;
            increment_milestone_version(&bumped, release_type)?
        }
        ReleaseType::Rc if on_pre_release => increment_milestone_version(&parts, release_type)?,
        ReleaseType::Rc => {
            let bumped = increment_version(&parts, (1, 0, 0))?;
            increment_milestone_version(&bumped, release_type)?
        }
        ReleaseType::Eol => {
            return Ok(SentinelTag::new(series, SentinelKind::EndOfLife).to_string())
        }
        ReleaseType::Em => {
            return Ok(SentinelTag::new(series, SentinelKind::ExtendedMaintenance).to_string())
        }
    };

    Ok(new_parts.join("."))
}
