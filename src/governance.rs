//! Team and repository ownership lookups
//!
//! Governance data says which team owns a deliverable and which
//! repositories make it up. The validator only asks two questions, through
//! the [`Governance`] trait, so the data source can be a YAML file, an
//! in-memory table in tests, or nothing at all.

use crate::error::{ReleaseError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// What governance knows about a team
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamInfo {
    pub name: String,
    pub ptl: Option<String>,
    pub liaisons: Vec<String>,
}

pub trait Governance: Send + Sync {
    /// `Ok(None)` when the team is not listed
    fn resolve_team(&self, team: &str) -> Result<Option<TeamInfo>>;

    /// Repositories governance lists for a deliverable, empty when unknown
    fn resolve_repositories(&self, deliverable: &str) -> Result<BTreeSet<String>>;
}

#[derive(Debug, Default, Deserialize)]
struct GovernanceFile {
    #[serde(default)]
    teams: BTreeMap<String, TeamEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct TeamEntry {
    #[serde(default)]
    ptl: Option<String>,
    #[serde(default)]
    liaisons: Vec<String>,
    #[serde(default)]
    deliverables: BTreeMap<String, DeliverableEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DeliverableEntry {
    #[serde(default)]
    repos: Vec<String>,
}

/// Governance data held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticGovernance {
    teams: BTreeMap<String, TeamInfo>,
    repositories: BTreeMap<String, BTreeSet<String>>,
}

impl StaticGovernance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `teams: {team: {ptl, liaisons, deliverables: {name: {repos}}}}`
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: GovernanceFile = serde_yaml::from_str(yaml)?;
        let mut governance = Self::new();
        for (name, entry) in file.teams {
            governance.add_team(TeamInfo {
                name: name.clone(),
                ptl: entry.ptl,
                liaisons: entry.liaisons,
            });
            for (deliverable, d) in entry.deliverables {
                governance.add_deliverable(&deliverable, d.repos);
            }
        }
        Ok(governance)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn add_team(&mut self, team: TeamInfo) {
        self.teams.insert(team.name.clone(), team);
    }

    pub fn add_deliverable<I, S>(&mut self, deliverable: &str, repos: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.repositories
            .entry(deliverable.to_string())
            .or_default()
            .extend(repos.into_iter().map(Into::into));
    }
}

impl Governance for StaticGovernance {
    fn resolve_team(&self, team: &str) -> Result<Option<TeamInfo>> {
        Ok(self.teams.get(team).cloned())
    }

    fn resolve_repositories(&self, deliverable: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .repositories
            .get(deliverable)
            .cloned()
            .unwrap_or_default())
    }
}

/// Stand-in used when no governance data is configured
#[derive(Debug, Clone)]
pub struct UnavailableGovernance {
    reason: String,
}

impl UnavailableGovernance {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableGovernance {
            reason: reason.into(),
        }
    }
}

impl Governance for UnavailableGovernance {
    fn resolve_team(&self, _team: &str) -> Result<Option<TeamInfo>> {
        Err(ReleaseError::collaborator(self.reason.clone()))
    }

    fn resolve_repositories(&self, _deliverable: &str) -> Result<BTreeSet<String>> {
        Err(ReleaseError::collaborator(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECTS: &str = r#"
teams:
  nova:
    ptl: Jane Doe
    liaisons: [john]
    deliverables:
      nova:
        repos:
          - openstack/nova
      python-novaclient:
        repos:
          - openstack/python-novaclient
"#;

    #[test]
    fn test_from_yaml() {
        let gov = StaticGovernance::from_yaml_str(PROJECTS).unwrap();
        let team = gov.resolve_team("nova").unwrap().unwrap();
        assert_eq!(team.ptl.as_deref(), Some("Jane Doe"));
        assert_eq!(team.liaisons, vec!["john".to_string()]);
        assert!(gov.resolve_team("glance").unwrap().is_none());

        let repos = gov.resolve_repositories("nova").unwrap();
        assert!(repos.contains("openstack/nova"));
        assert!(gov.resolve_repositories("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_built_in_code() {
        let mut gov = StaticGovernance::new();
        gov.add_team(TeamInfo {
            name: "oslo".into(),
            ..Default::default()
        });
        gov.add_deliverable("oslo.config", ["openstack/oslo.config"]);
        assert!(gov.resolve_team("oslo").unwrap().is_some());
        assert_eq!(gov.resolve_repositories("oslo.config").unwrap().len(), 1);
    }

    #[test]
    fn test_unavailable() {
        let gov = UnavailableGovernance::new("no governance data configured");
        assert!(gov.resolve_team("nova").is_err());
        assert!(gov.resolve_repositories("nova").is_err());
    }
}
