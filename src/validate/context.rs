use crate::ci::JobTemplates;
use crate::domain::deliverable::{Deliverable, DeliverableIndex, Release};
use crate::domain::series::SeriesStatus;
use crate::error::Result;
use crate::git::GitOps;
use crate::governance::Governance;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A warning or error recorded by a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub filename: String,
    pub rule: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.filename, self.rule, self.message)
    }
}

/// Per-run directory for repository clones
///
/// Removed on drop unless created with `cleanup = false`.
#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(cleanup: bool) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("releases-").tempdir()?;
        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "created scratch workspace");
        if cleanup {
            Ok(ScratchDir {
                dir: Some(dir),
                path,
            })
        } else {
            let path = dir.into_path();
            Ok(ScratchDir { dir: None, path })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_kept(&self) -> bool {
        self.dir.is_none()
    }
}

/// The external services rules may consult
pub struct Collaborators {
    pub git: Box<dyn GitOps>,
    pub governance: Box<dyn Governance>,
    pub jobs: Box<dyn JobTemplates>,
}

impl Collaborators {
    pub fn new(
        git: impl GitOps + 'static,
        governance: impl Governance + 'static,
        jobs: impl JobTemplates + 'static,
    ) -> Self {
        Collaborators {
            git: Box::new(git),
            governance: Box::new(governance),
            jobs: Box::new(jobs),
        }
    }
}

/// Shared state for one validation run
///
/// Every finding is recorded here, tagged with the file and rule being
/// checked. The tag-existence cache lives for the run and no longer.
pub struct ValidationContext {
    collaborators: Collaborators,
    series_status: SeriesStatus,
    index: DeliverableIndex,
    current_series: String,
    debug: bool,
    scratch: Option<ScratchDir>,
    filename: String,
    rule: String,
    warnings: Vec<Finding>,
    errors: Vec<Finding>,
    tag_cache: HashMap<(String, String), bool>,
}

impl ValidationContext {
    pub fn new(
        collaborators: Collaborators,
        series_status: SeriesStatus,
        index: DeliverableIndex,
        current_series: impl Into<String>,
    ) -> Self {
        ValidationContext {
            collaborators,
            series_status,
            index,
            current_series: current_series.into(),
            debug: false,
            scratch: None,
            filename: String::new(),
            rule: String::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            tag_cache: HashMap::new(),
        }
    }

    /// Stop at the first error instead of collecting them
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_scratch(mut self, scratch: ScratchDir) -> Self {
        self.scratch = Some(scratch);
        self
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn git(&self) -> &dyn GitOps {
        self.collaborators.git.as_ref()
    }

    pub fn governance(&self) -> &dyn Governance {
        self.collaborators.governance.as_ref()
    }

    pub fn jobs(&self) -> &dyn JobTemplates {
        self.collaborators.jobs.as_ref()
    }

    pub fn series_status(&self) -> &SeriesStatus {
        &self.series_status
    }

    pub fn index(&self) -> &DeliverableIndex {
        &self.index
    }

    pub fn current_series(&self) -> &str {
        &self.current_series
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(ScratchDir::path)
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_rule(&mut self, rule: impl Into<String>) {
        self.rule = rule.into();
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(rule = %self.rule, "{}", message);
        let finding = self.finding(Severity::Warning, message);
        self.warnings.push(finding);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(rule = %self.rule, "{}", message);
        let finding = self.finding(Severity::Error, message);
        self.errors.push(finding);
    }

    fn finding(&self, severity: Severity, message: String) -> Finding {
        Finding {
            severity,
            filename: self.filename.clone(),
            rule: self.rule.clone(),
            message,
        }
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Finding] {
        &self.errors
    }

    /// Whether `version` is already tagged in `repo`, memoized for the run
    pub fn tag_exists(&mut self, repo: &str, version: &str) -> Result<bool> {
        let key = (repo.to_string(), version.to_string());
        if let Some(exists) = self.tag_cache.get(&key) {
            return Ok(*exists);
        }
        let exists = self.collaborators.git.commit_exists(repo, version)?;
        tracing::debug!(repo, version, exists, "checked for existing tag");
        self.tag_cache.insert(key, exists);
        Ok(exists)
    }

    /// A release is new if any of its repositories lacks the tag
    pub fn is_new_release(&mut self, release: &Release) -> Result<bool> {
        for project in &release.projects {
            if !self.tag_exists(&project.repo, &release.version)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn has_new_release(&mut self, deliverable: &Deliverable) -> Result<bool> {
        for release in deliverable.releases() {
            if self.is_new_release(release)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Releases of `deliverable` not yet tagged everywhere
    pub fn new_releases<'d>(&mut self, deliverable: &'d Deliverable) -> Result<Vec<&'d Release>> {
        let mut new = Vec::new();
        for release in deliverable.releases() {
            if self.is_new_release(release)? {
                new.push(release);
            }
        }
        Ok(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::StaticJobTemplates;
    use crate::git::MockGit;
    use crate::governance::StaticGovernance;

    fn context(git: MockGit) -> ValidationContext {
        ValidationContext::new(
            Collaborators::new(git, StaticGovernance::new(), StaticJobTemplates::new()),
            SeriesStatus::default(),
            DeliverableIndex::default(),
            "2024.1",
        )
    }

    #[test]
    fn test_findings_are_tagged() {
        let mut ctx = context(MockGit::new());
        ctx.set_filename("2024.1/nova.yaml");
        ctx.set_rule("team");
        ctx.warning("Team 'x' not in governance data");
        ctx.error("no team specified");

        assert_eq!(ctx.warnings().len(), 1);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(
            ctx.errors()[0].to_string(),
            "2024.1/nova.yaml [team]: no team specified"
        );
        assert_eq!(ctx.errors()[0].severity, Severity::Error);
    }

    #[test]
    fn test_new_release_detection() {
        let mut git = MockGit::new();
        git.add_tag("openstack/nova", "29.0.0", "a1");
        let mut ctx = context(git);

        let deliv = Deliverable::from_yaml_str(
            "2024.1",
            "nova",
            r#"
releases:
  - version: 29.0.0
    projects:
      - repo: openstack/nova
        hash: a1
  - version: 29.0.1
    projects:
      - repo: openstack/nova
        hash: a2
"#,
        )
        .unwrap();

        assert!(ctx.tag_exists("openstack/nova", "29.0.0").unwrap());
        assert!(ctx.has_new_release(&deliv).unwrap());
        let new = ctx.new_releases(&deliv).unwrap();
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].version, "29.0.1");
    }

    #[test]
    fn test_scratch_dir_cleanup() {
        let scratch = ScratchDir::new(true).unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        assert!(!scratch.is_kept());
        drop(scratch);
        assert!(!path.exists());

        let kept = ScratchDir::new(false).unwrap();
        let path = kept.path().to_path_buf();
        assert!(kept.is_kept());
        drop(kept);
        assert!(path.exists());
        std::fs::remove_dir_all(path).unwrap();
    }
}
