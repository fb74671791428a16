//! Release job templates and release-type resolution
//!
//! Every repository that publishes artifacts needs exactly one release job
//! template in the CI configuration, and which template depends on the
//! release type. The CI configuration is reached through [`JobTemplates`].

use crate::domain::deliverable::Deliverable;
use crate::error::{ReleaseError, Result};
use crate::git::GitOps;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub trait JobTemplates: Send + Sync {
    /// Templates attached to `repo`; `Ok(None)` if the repository is not
    /// configured at all
    fn release_job_templates(&self, repo: &str) -> Result<Option<Vec<String>>>;
}

/// Job templates held in memory, `{repo: [template, ...]}`
#[derive(Debug, Clone, Default)]
pub struct StaticJobTemplates {
    templates: BTreeMap<String, Vec<String>>,
}

impl StaticJobTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let templates: Option<BTreeMap<String, Vec<String>>> = serde_yaml::from_str(yaml)?;
        Ok(StaticJobTemplates {
            templates: templates.unwrap_or_default(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn add_repo<I, S>(&mut self, repo: &str, templates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.templates.insert(
            repo.to_string(),
            templates.into_iter().map(Into::into).collect(),
        );
    }
}

impl JobTemplates for StaticJobTemplates {
    fn release_job_templates(&self, repo: &str) -> Result<Option<Vec<String>>> {
        Ok(self.templates.get(repo).cloned())
    }
}

/// Stand-in used when no CI configuration is available
#[derive(Debug, Clone)]
pub struct UnavailableJobTemplates {
    reason: String,
}

impl UnavailableJobTemplates {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableJobTemplates {
            reason: reason.into(),
        }
    }
}

impl JobTemplates for UnavailableJobTemplates {
    fn release_job_templates(&self, _repo: &str) -> Result<Option<Vec<String>>> {
        Err(ReleaseError::collaborator(self.reason.clone()))
    }
}

const PYPI_JOBS: &[&str] = &["publish-to-pypi", "publish-to-pypi-stable-only"];

const RELEASE_JOBS_FOR_TYPE: &[(&str, &[&str])] = &[
    ("python-service", PYPI_JOBS),
    ("python-pypi", PYPI_JOBS),
    ("neutron", PYPI_JOBS),
    ("horizon", PYPI_JOBS),
    ("xstatic", PYPI_JOBS),
    (
        "nodejs",
        &[
            "nodejs4-publish-to-npm",
            "nodejs6-publish-to-npm",
            "nodejs8-publish-to-npm",
        ],
    ),
    ("puppet", &["puppet-tarball-jobs", "puppet-release-jobs"]),
    // packaged or pushed by other means
    ("fuel", &[]),
    ("openstack-manuals", &[]),
];

/// Templates that publish a release of `release_type`
///
/// Unknown types expect the python-service templates.
pub fn expected_release_jobs(release_type: &str) -> &'static [&'static str] {
    RELEASE_JOBS_FOR_TYPE
        .iter()
        .find(|(rt, _)| *rt == release_type)
        .map(|(_, jobs)| *jobs)
        .unwrap_or(PYPI_JOBS)
}

/// Templates present on the repository that belong to other release types
pub fn unexpected_release_jobs(release_type: &str, templates: &[String]) -> Vec<(String, String)> {
    let expected = expected_release_jobs(release_type);
    let mut unexpected = Vec::new();
    for (other_type, jobs) in RELEASE_JOBS_FOR_TYPE {
        if *other_type == release_type {
            continue;
        }
        for job in jobs.iter() {
            let attached = templates.iter().any(|t| t.as_str() == *job);
            let already_reported = unexpected.iter().any(|(j, _): &(String, String)| j.as_str() == *job);
            if attached && !expected.contains(job) && !already_reported {
                unexpected.push((job.to_string(), other_type.to_string()));
            }
        }
    }
    unexpected
}

/// Release type of `repo`, and whether it was set explicitly
///
/// Falls back through the deliverable type, the PyPI link flag and the
/// presence of puppet or npm metadata before assuming `python-service`.
pub fn resolve_release_type(
    deliverable: &Deliverable,
    repo: &str,
    reference: &str,
    git: &dyn GitOps,
) -> Result<(String, bool)> {
    if let Some(explicit) = deliverable.release_type() {
        return Ok((explicit.to_string(), true));
    }

    let from_type = match deliverable.deliverable_type() {
        "library" => Some("python-pypi"),
        "service" => Some("python-service"),
        "horizon-plugin" => Some("horizon"),
        _ => None,
    };
    if let Some(release_type) = from_type {
        return Ok((release_type.to_string(), false));
    }

    if deliverable.include_pypi_link() {
        return Ok(("python-pypi".to_string(), false));
    }
    if git.file_exists(repo, reference, "metadata.json")? {
        return Ok(("puppet".to_string(), false));
    }
    if git.file_exists(repo, reference, "package.json")? {
        return Ok(("nodejs".to_string(), false));
    }
    Ok(("python-service".to_string(), false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockGit;

    #[test]
    fn test_expected_jobs() {
        assert!(expected_release_jobs("python-pypi").contains(&"publish-to-pypi"));
        assert!(expected_release_jobs("puppet").contains(&"puppet-release-jobs"));
        assert!(expected_release_jobs("fuel").is_empty());
        assert_eq!(
            expected_release_jobs("something-new"),
            expected_release_jobs("python-service")
        );
    }

    #[test]
    fn test_unexpected_jobs() {
        let templates = vec![
            "publish-to-pypi".to_string(),
            "puppet-release-jobs".to_string(),
        ];
        let unexpected = unexpected_release_jobs("python-service", &templates);
        assert_eq!(
            unexpected,
            vec![("puppet-release-jobs".to_string(), "puppet".to_string())]
        );
        assert!(unexpected_release_jobs("python-pypi", &templates[..1]).is_empty());
    }

    #[test]
    fn test_static_templates_from_yaml() {
        let jobs = StaticJobTemplates::from_yaml_str(
            "openstack/nova:\n  - publish-to-pypi\n  - check-requirements\n",
        )
        .unwrap();
        assert_eq!(
            jobs.release_job_templates("openstack/nova").unwrap().unwrap().len(),
            2
        );
        assert!(jobs.release_job_templates("openstack/other").unwrap().is_none());
    }

    #[test]
    fn test_resolve_release_type() {
        let git = MockGit::new();
        let explicit =
            Deliverable::from_yaml_str("2024.1", "x", "release-type: xstatic\n").unwrap();
        assert_eq!(
            resolve_release_type(&explicit, "r", "master", &git).unwrap(),
            ("xstatic".to_string(), true)
        );

        let library = Deliverable::from_yaml_str("2024.1", "x", "type: library\n").unwrap();
        assert_eq!(
            resolve_release_type(&library, "r", "master", &git).unwrap().0,
            "python-pypi"
        );

        let pypi = Deliverable::from_yaml_str("2024.1", "x", "include-pypi-link: true\n").unwrap();
        assert_eq!(
            resolve_release_type(&pypi, "r", "master", &git).unwrap().0,
            "python-pypi"
        );
    }

    #[test]
    fn test_resolve_release_type_detects_modules() {
        let mut git = MockGit::new();
        git.add_branch("openstack/puppet-nova", "master", &["p1"]);
        git.add_file("openstack/puppet-nova", "metadata.json");
        let deliv = Deliverable::from_yaml_str("2024.1", "puppet-nova", "type: other\n").unwrap();
        assert_eq!(
            resolve_release_type(&deliv, "openstack/puppet-nova", "master", &git)
                .unwrap()
                .0,
            "puppet"
        );
        assert_eq!(
            resolve_release_type(&deliv, "openstack/unknown", "master", &git)
                .unwrap()
                .0,
            "python-service"
        );
    }
}
