//! Deliverable files and their read-only view
//!
//! A deliverable file lives at `<root>/<series>/<name>.yaml`; files for the
//! independent pseudo-series are stored under `_independent`. The on-disk
//! schema is [`DeliverableFile`], which round-trips unknown keys so that
//! rewriting a file only changes what the caller changed. Validation works
//! on [`Deliverable`], an immutable view with the derived properties the
//! rules need.

use crate::domain::branch::{Branch, BranchLocation, StableBranchType};
use crate::domain::series::{compare_series, SeriesStatus, StableStatus, INDEPENDENT};
use crate::domain::tag::{SentinelKind, SentinelTag};
use crate::domain::version::{classify, Classification};
use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// YAML happily reads `version: 2.0` as a float
fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a version string, got {:?}",
            other
        ))),
    }
}

fn optional_scalar_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a version string, got {:?}",
            other
        ))),
    }
}

/// On-disk schema of a deliverable file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeliverableFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub deliverable_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_link_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_branch_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_pypi_link: Option<bool>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub repository_settings: BTreeMap<String, RepoSettings>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub releases: Vec<ReleaseData>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub branches: Vec<Branch>,
    /// Keys this tool does not interpret (`launchpad`, `release-notes`, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DeliverableFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // an empty document is an empty deliverable
        let parsed: Option<DeliverableFile> = serde_yaml::from_str(yaml)?;
        Ok(parsed.unwrap_or_default())
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoSettings {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pypi_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReleaseData {
    #[serde(deserialize_with = "scalar_text")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectData>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(
        default,
        deserialize_with = "optional_scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub diff_start: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectData {
    pub repo: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tarball_base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// How a deliverable is released over a development cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReleaseModel {
    Independent,
    Abandoned,
    Untagged,
    CycleWithRc,
    CycleWithMilestones,
    CycleWithIntermediary,
    CycleTrailing,
    /// No `release-model` key
    Unspecified,
    Unknown(String),
}

impl ReleaseModel {
    pub fn parse(value: &str) -> Self {
        match value {
            "" => ReleaseModel::Unspecified,
            "independent" => ReleaseModel::Independent,
            "abandoned" => ReleaseModel::Abandoned,
            "untagged" => ReleaseModel::Untagged,
            "cycle-with-rc" => ReleaseModel::CycleWithRc,
            "cycle-with-milestones" => ReleaseModel::CycleWithMilestones,
            "cycle-with-intermediary" => ReleaseModel::CycleWithIntermediary,
            "cycle-trailing" => ReleaseModel::CycleTrailing,
            other => ReleaseModel::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReleaseModel::Independent => "independent",
            ReleaseModel::Abandoned => "abandoned",
            ReleaseModel::Untagged => "untagged",
            ReleaseModel::CycleWithRc => "cycle-with-rc",
            ReleaseModel::CycleWithMilestones => "cycle-with-milestones",
            ReleaseModel::CycleWithIntermediary => "cycle-with-intermediary",
            ReleaseModel::CycleTrailing => "cycle-trailing",
            ReleaseModel::Unspecified => "",
            ReleaseModel::Unknown(other) => other,
        }
    }

    pub fn is_cycle_based(&self) -> bool {
        self.as_str().starts_with("cycle-")
    }

    pub fn is_milestone_based(&self) -> bool {
        matches!(
            self,
            ReleaseModel::CycleWithRc | ReleaseModel::CycleWithMilestones
        )
    }

    /// Models whose versions may carry a pre-release suffix
    pub fn allows_pre_releases(&self) -> bool {
        matches!(
            self,
            ReleaseModel::CycleWithRc
                | ReleaseModel::CycleWithMilestones
                | ReleaseModel::CycleTrailing
        )
    }
}

impl fmt::Display for ReleaseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A repository that belongs to a deliverable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub name: String,
    pub flags: Vec<String>,
    pub tarball_base: Option<String>,
    pub pypi_name: Option<String>,
}

impl Repo {
    fn new(name: &str, settings: Option<&RepoSettings>) -> Self {
        Repo {
            name: name.to_string(),
            flags: settings.map(|s| s.flags.clone()).unwrap_or_default(),
            tarball_base: settings.and_then(|s| s.tarball_base.clone()),
            pypi_name: settings.and_then(|s| s.pypi_name.clone()),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.flags.iter().any(|f| f == "retired")
    }

    pub fn no_artifact_build_job(&self) -> bool {
        self.flags.iter().any(|f| f == "no-artifact-build-job")
    }

    /// `openstack/nova` -> `nova`
    pub fn base_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// One repository's commit within a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseProject {
    pub repo: String,
    pub hash: String,
    pub tarball_base: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    /// Sorted by repository name
    pub projects: Vec<ReleaseProject>,
    pub flags: Vec<String>,
    pub diff_start: Option<String>,
}

impl Release {
    fn from_data(data: &ReleaseData) -> Self {
        let mut projects: Vec<ReleaseProject> = data
            .projects
            .iter()
            .map(|p| ReleaseProject {
                repo: p.repo.clone(),
                hash: p.hash.clone(),
                tarball_base: p.tarball_base.clone(),
                comment: p.comment.clone(),
            })
            .collect();
        projects.sort_by(|a, b| a.repo.cmp(&b.repo));
        Release {
            version: data.version.clone(),
            projects,
            flags: data.flags.clone(),
            diff_start: data.diff_start.clone(),
        }
    }

    pub fn project(&self, repo: &str) -> Option<&ReleaseProject> {
        self.projects.iter().find(|p| p.repo == repo)
    }

    pub fn repo_names(&self) -> BTreeSet<String> {
        self.projects.iter().map(|p| p.repo.clone()).collect()
    }

    pub fn classification(&self) -> Classification {
        classify(&self.version)
    }

    pub fn sentinel(&self) -> Option<SentinelTag> {
        SentinelTag::parse(&self.version)
    }

    pub fn is_sentinel(&self) -> bool {
        self.sentinel().is_some()
    }

    pub fn is_eol(&self) -> bool {
        matches!(self.sentinel(), Some(tag) if tag.kind == SentinelKind::EndOfLife)
    }

    pub fn is_em(&self) -> bool {
        matches!(self.sentinel(), Some(tag) if tag.kind == SentinelKind::ExtendedMaintenance)
    }

    pub fn is_pre_release(&self) -> bool {
        self.classification().is_pre_release()
    }

    pub fn is_release_candidate(&self) -> bool {
        self.classification() == Classification::ReleaseCandidate
    }
}

/// Immutable view of one deliverable in one series
#[derive(Debug, Clone)]
pub struct Deliverable {
    series: String,
    name: String,
    data: DeliverableFile,
    repos: BTreeMap<String, Repo>,
    releases: Vec<Release>,
}

impl Deliverable {
    pub fn new(series: impl Into<String>, name: impl Into<String>, data: DeliverableFile) -> Self {
        let mut repo_names: BTreeSet<&str> =
            data.repository_settings.keys().map(|s| s.as_str()).collect();
        for release in &data.releases {
            for project in &release.projects {
                repo_names.insert(project.repo.as_str());
            }
        }
        let repos = repo_names
            .into_iter()
            .map(|name| {
                let repo = Repo::new(name, data.repository_settings.get(name));
                (name.to_string(), repo)
            })
            .collect();
        let releases = data.releases.iter().map(Release::from_data).collect();

        Deliverable {
            series: series.into(),
            name: name.into(),
            data,
            repos,
            releases,
        }
    }

    pub fn from_yaml_str(series: &str, name: &str, yaml: &str) -> Result<Self> {
        Ok(Self::new(series, name, DeliverableFile::from_yaml_str(yaml)?))
    }

    /// Read `<root>/<series>/<name>.yaml`
    pub fn read_file(path: &Path) -> Result<Self> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ReleaseError::deliverable(format!("Cannot derive a name from {}", path.display()))
            })?;
        let series = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .map(|s| s.trim_start_matches('_'))
            .ok_or_else(|| {
                ReleaseError::deliverable(format!(
                    "Cannot derive a series from {}",
                    path.display()
                ))
            })?;
        let content = fs::read_to_string(path)?;
        let data = DeliverableFile::from_yaml_str(&content).map_err(|e| {
            ReleaseError::deliverable(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::new(series, name, data))
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn team(&self) -> Option<&str> {
        self.data.team.as_deref()
    }

    pub fn data(&self) -> &DeliverableFile {
        &self.data
    }

    /// `<series>/<name>.yaml`, relative to the deliverables root
    pub fn filename(&self) -> String {
        format!("{}/{}.yaml", self.series, self.name)
    }

    pub fn repos(&self) -> impl Iterator<Item = &Repo> {
        self.repos.values()
    }

    pub fn get_repo(&self, name: &str) -> Option<&Repo> {
        self.repos.get(name)
    }

    /// Distribution name a release project is expected to build
    ///
    /// The project's `tarball-base` wins over the repository's, and both
    /// fall back to the repository base name.
    pub fn expected_sdist_name<'a>(&'a self, project: &'a ReleaseProject) -> (&'a str, bool) {
        let configured = project.tarball_base.as_deref().or_else(|| {
            self.get_repo(&project.repo)
                .and_then(|r| r.tarball_base.as_deref())
        });
        match configured {
            Some(name) => (name, true),
            None => {
                let base = self.get_repo(&project.repo).map(Repo::base_name);
                (
                    base.unwrap_or_else(|| {
                        project.repo.rsplit('/').next().unwrap_or(&project.repo)
                    }),
                    false,
                )
            }
        }
    }

    /// Repositories declared in `repository-settings`
    pub fn known_repo_names(&self) -> BTreeSet<String> {
        self.data.repository_settings.keys().cloned().collect()
    }

    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn branches(&self) -> &[Branch] {
        &self.data.branches
    }

    /// The `release-model` value exactly as written
    pub fn declared_model(&self) -> Option<&str> {
        self.data.release_model.as_deref()
    }

    /// Effective model; anything in the independent series is independent
    /// unless it was abandoned
    pub fn model(&self) -> ReleaseModel {
        let declared = ReleaseModel::parse(self.declared_model().unwrap_or(""));
        if self.is_independent() && declared != ReleaseModel::Abandoned {
            return ReleaseModel::Independent;
        }
        declared
    }

    pub fn is_independent(&self) -> bool {
        self.series == INDEPENDENT
    }

    pub fn is_releasable(&self) -> bool {
        self.model() != ReleaseModel::Untagged
    }

    pub fn is_released(&self) -> bool {
        !self.releases.is_empty()
    }

    pub fn is_cycle_based(&self) -> bool {
        self.model().is_cycle_based()
    }

    pub fn is_milestone_based(&self) -> bool {
        self.model().is_milestone_based()
    }

    /// Tempest and its plugins never branch
    pub fn deliverable_type(&self) -> &str {
        if self.name.contains("tempest-plugin") {
            return "tempest-plugin";
        }
        if self.model() == ReleaseModel::CycleTrailing {
            return "trailing";
        }
        self.data.deliverable_type.as_deref().unwrap_or("other")
    }

    pub fn artifact_link_mode(&self) -> &str {
        self.data.artifact_link_mode.as_deref().unwrap_or("tarball")
    }

    pub fn release_type(&self) -> Option<&str> {
        self.data.release_type.as_deref()
    }

    pub fn include_pypi_link(&self) -> bool {
        self.data.include_pypi_link.unwrap_or(false)
    }

    pub fn earliest_release(&self) -> Option<&Release> {
        self.releases.first()
    }

    pub fn latest_release(&self) -> Option<&Release> {
        self.releases.last()
    }

    /// Newest release that is not an eol/em/last sentinel
    pub fn latest_ordinary_release(&self) -> Option<&Release> {
        self.releases.iter().rev().find(|r| !r.is_sentinel())
    }

    pub fn is_first_release(&self) -> bool {
        self.releases.len() == 1
    }

    pub fn get_release(&self, version: &str) -> Option<&Release> {
        self.releases.iter().find(|r| r.version == version)
    }

    pub fn get_branch_location(&self, name: &str) -> Option<&BranchLocation> {
        self.branches()
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.location)
    }

    /// Commit per repository where `branch` starts
    ///
    /// `None` when the location names a version this deliverable never
    /// released.
    pub fn branch_repo_map(&self, branch: &Branch) -> Option<BTreeMap<String, String>> {
        match &branch.location {
            BranchLocation::Commits(commits) => Some(commits.clone()),
            BranchLocation::Version(version) => self.get_release(version).map(|release| {
                release
                    .projects
                    .iter()
                    .map(|p| (p.repo.clone(), p.hash.clone()))
                    .collect()
            }),
        }
    }

    /// `stable-branch-type`, defaulting to `std`; `None` for `none`
    pub fn stable_branch_type(&self) -> Result<Option<StableBranchType>> {
        StableBranchType::parse_optional(self.data.stable_branch_type.as_deref().unwrap_or("std"))
    }

    pub fn stable_status(&self, series_status: &SeriesStatus) -> Result<StableStatus> {
        if self.model() == ReleaseModel::Abandoned {
            return Ok(StableStatus::EndOfLife);
        }
        match &self.data.stable_status {
            Some(explicit) => explicit.parse(),
            None if self.is_independent() => Ok(StableStatus::Development),
            None => Ok(series_status.status_of(&self.series)),
        }
    }

    pub fn allows_releases(&self, series_status: &SeriesStatus) -> Result<bool> {
        Ok(self.stable_status(series_status)?.allows_releases())
    }
}

/// Every deliverable file under a root directory
#[derive(Debug, Clone, Default)]
pub struct DeliverableIndex {
    deliverables: Vec<Deliverable>,
}

impl DeliverableIndex {
    pub fn from_deliverables(deliverables: impl IntoIterator<Item = Deliverable>) -> Self {
        DeliverableIndex {
            deliverables: deliverables.into_iter().collect(),
        }
    }

    /// Load `<root>/<series>/<name>.yaml` for every series directory
    ///
    /// Files that cannot be read or parsed are left out of the index with a
    /// warning. Validating such a file reports it on its own.
    pub fn load(root: &Path) -> Result<Self> {
        let mut series_dirs: Vec<_> = fs::read_dir(root)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        series_dirs.sort();

        let mut deliverables = Vec::new();
        for dir in series_dirs {
            let mut files: Vec<_> = fs::read_dir(&dir)?
                .collect::<std::io::Result<Vec<_>>>()?
                .into_iter()
                .map(|entry| entry.path())
                .filter(|path| path.extension().map(|e| e == "yaml").unwrap_or(false))
                .collect();
            files.sort();
            for file in files {
                tracing::debug!(file = %file.display(), "loading deliverable");
                match Deliverable::read_file(&file) {
                    Ok(deliv) => deliverables.push(deliv),
                    Err(e) => tracing::warn!("skipping unreadable deliverable: {}", e),
                }
            }
        }

        Ok(Self::from_deliverables(deliverables))
    }

    pub fn len(&self) -> usize {
        self.deliverables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliverables.is_empty()
    }

    pub fn get(&self, series: &str, name: &str) -> Option<&Deliverable> {
        self.deliverables
            .iter()
            .find(|d| d.series() == series && d.name() == name)
    }

    /// Series names with at least one deliverable, oldest first
    pub fn series_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .deliverables
            .iter()
            .map(|d| d.series().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        names.sort_by(|a, b| compare_series(a, b));
        names
    }

    /// Every copy of the named deliverable, oldest series first
    pub fn history(&self, name: &str) -> Vec<&Deliverable> {
        let mut history: Vec<&Deliverable> = self
            .deliverables
            .iter()
            .filter(|d| d.name() == name)
            .collect();
        history.sort_by(|a, b| compare_series(a.series(), b.series()));
        history
    }

    /// The cycle-based copy of `name` in the series before `series`
    pub fn previous_in_cycle(&self, name: &str, series: &str) -> Option<&Deliverable> {
        self.history(name)
            .into_iter()
            .filter(|d| !d.is_independent())
            .filter(|d| compare_series(d.series(), series) == std::cmp::Ordering::Less)
            .last()
    }
}
