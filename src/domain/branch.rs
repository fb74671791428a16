use crate::error::{ReleaseError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Prefix of a branch name such as `stable/2024.1`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BranchPrefix {
    Stable,
    Feature,
    Bugfix,
    Other(String),
}

impl BranchPrefix {
    pub fn parse(prefix: &str) -> Self {
        match prefix {
            "stable" => BranchPrefix::Stable,
            "feature" => BranchPrefix::Feature,
            "bugfix" => BranchPrefix::Bugfix,
            other => BranchPrefix::Other(other.to_string()),
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, BranchPrefix::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            BranchPrefix::Stable => "stable",
            BranchPrefix::Feature => "feature",
            BranchPrefix::Bugfix => "bugfix",
            BranchPrefix::Other(other) => other,
        }
    }
}

impl fmt::Display for BranchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How stable branches of a deliverable are described
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StableBranchType {
    /// Location is an existing release version
    Std,
    /// Location maps each repository to a commit SHA
    Tagless,
    /// Branch names follow upstream releases, not series names
    Upstream,
}

impl StableBranchType {
    /// Parse the `stable-branch-type` value; `none` means no stable branches
    pub fn parse_optional(value: &str) -> Result<Option<Self>> {
        if value == "none" {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StableBranchType::Std => "std",
            StableBranchType::Tagless => "tagless",
            StableBranchType::Upstream => "upstream",
        }
    }
}

impl FromStr for StableBranchType {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "std" => Ok(StableBranchType::Std),
            "tagless" => Ok(StableBranchType::Tagless),
            "upstream" => Ok(StableBranchType::Upstream),
            other => Err(ReleaseError::deliverable(format!(
                "unrecognized stable-branch-type '{}'",
                other
            ))),
        }
    }
}

/// Where a branch starts: a release version or one commit per repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BranchLocation {
    Version(String),
    Commits(BTreeMap<String, String>),
}

impl BranchLocation {
    pub fn describe(&self) -> &'static str {
        match self {
            BranchLocation::Version(_) => "a version string",
            BranchLocation::Commits(_) => "a mapping",
        }
    }
}

impl<'de> Deserialize<'de> for BranchLocation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        use serde_yaml::Value;

        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(BranchLocation::Version(s)),
            Value::Number(n) => Ok(BranchLocation::Version(n.to_string())),
            Value::Mapping(mapping) => {
                let mut commits = BTreeMap::new();
                for (repo, sha) in mapping {
                    match (repo, sha) {
                        (Value::String(repo), Value::String(sha)) => {
                            commits.insert(repo, sha);
                        }
                        _ => {
                            return Err(D::Error::custom(
                                "branch location mapping must be repo: sha strings",
                            ))
                        }
                    }
                }
                Ok(BranchLocation::Commits(commits))
            }
            other => Err(D::Error::custom(format!(
                "branch location must be a version or a mapping, got {:?}",
                other
            ))),
        }
    }
}

/// A branch declared in a deliverable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub location: BranchLocation,
}

impl Branch {
    pub fn new(name: impl Into<String>, location: BranchLocation) -> Self {
        Branch {
            name: name.into(),
            location,
        }
    }

    /// Split `prefix/identifier`; `None` unless there is exactly one `/`
    pub fn split_name(&self) -> Option<(BranchPrefix, &str)> {
        let (prefix, identifier) = self.name.split_once('/')?;
        if identifier.contains('/') || identifier.is_empty() {
            return None;
        }
        Some((BranchPrefix::parse(prefix), identifier))
    }

    pub fn prefix(&self) -> BranchPrefix {
        let prefix = self.name.split('/').next().unwrap_or_default();
        BranchPrefix::parse(prefix)
    }

    /// The part after the prefix: a series for stable branches
    pub fn identifier(&self) -> Option<&str> {
        self.split_name().map(|(_, identifier)| identifier)
    }
}
