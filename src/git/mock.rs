use crate::error::{ReleaseError, Result};
use crate::git::{local_branch_name, GitOps};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
struct MockRepo {
    commits: HashSet<String>,
    tags: HashMap<String, String>,
    /// Linear history per branch, oldest commit first
    branches: HashMap<String, Vec<String>>,
    /// Path to contents, visible at every commit
    files: HashMap<String, String>,
}

impl MockRepo {
    fn resolve(&self, reference: &str) -> Option<String> {
        if let Some(sha) = self.tags.get(reference) {
            return Some(sha.clone());
        }
        let branch = local_branch_name(reference);
        if let Some(history) = self.branches.get(branch) {
            return history.last().cloned();
        }
        if self.commits.contains(reference) {
            return Some(reference.to_string());
        }
        None
    }
}

/// In-memory repositories for testing without network or disk access
#[derive(Debug, Default)]
pub struct MockGit {
    repos: HashMap<String, MockRepo>,
    failing: HashSet<String>,
}

impl MockGit {
    /// Create a mock with no repositories
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a commit that is on no branch
    pub fn add_commit(&mut self, repo: &str, sha: &str) {
        self.repo_mut(repo).commits.insert(sha.to_string());
    }

    /// Define a branch by its history, oldest commit first
    pub fn add_branch(&mut self, repo: &str, branch: &str, history: &[&str]) {
        let mock = self.repo_mut(repo);
        for sha in history {
            mock.commits.insert(sha.to_string());
        }
        mock.branches.insert(
            branch.to_string(),
            history.iter().map(|s| s.to_string()).collect(),
        );
    }

    /// Add a tag pointing at a commit
    pub fn add_tag(&mut self, repo: &str, tag: &str, sha: &str) {
        let mock = self.repo_mut(repo);
        mock.commits.insert(sha.to_string());
        mock.tags.insert(tag.to_string(), sha.to_string());
    }

    /// Add an empty file visible at every commit of the repository
    pub fn add_file(&mut self, repo: &str, path: &str) {
        self.add_file_content(repo, path, "");
    }

    /// Add a file with contents visible at every commit of the repository
    pub fn add_file_content(&mut self, repo: &str, path: &str, content: &str) {
        self.repo_mut(repo)
            .files
            .insert(path.to_string(), content.to_string());
    }

    /// Make every lookup in `repo` fail
    pub fn fail_repo(&mut self, repo: &str) {
        self.failing.insert(repo.to_string());
    }

    fn repo_mut(&mut self, repo: &str) -> &mut MockRepo {
        self.repos.entry(repo.to_string()).or_default()
    }

    fn repo(&self, repo: &str) -> Result<Option<&MockRepo>> {
        if self.failing.contains(repo) {
            return Err(ReleaseError::collaborator(format!(
                "simulated failure reaching {}",
                repo
            )));
        }
        Ok(self.repos.get(repo))
    }
}

impl GitOps for MockGit {
    fn commit_exists(&self, repo: &str, reference: &str) -> Result<bool> {
        Ok(self
            .repo(repo)?
            .and_then(|r| r.resolve(reference))
            .is_some())
    }

    fn checkout_ref(&self, repo: &str, reference: &str) -> Result<()> {
        let mock = self
            .repo(repo)?
            .ok_or_else(|| ReleaseError::collaborator(format!("could not clone {}", repo)))?;
        mock.resolve(reference).map(|_| ()).ok_or_else(|| {
            ReleaseError::collaborator(format!("{} has no ref {}", repo, reference))
        })
    }

    fn sha_for_tag(&self, repo: &str, reference: &str) -> Result<Option<String>> {
        Ok(self.repo(repo)?.and_then(|r| r.resolve(reference)))
    }

    fn branch_exists(&self, repo: &str, branch: &str) -> Result<bool> {
        Ok(self
            .repo(repo)?
            .map(|r| r.branches.contains_key(local_branch_name(branch)))
            .unwrap_or(false))
    }

    fn check_ancestry(&self, repo: &str, old: &str, new: &str) -> Result<bool> {
        let mock = match self.repo(repo)? {
            Some(mock) => mock,
            None => return Ok(false),
        };
        let (old, new) = match (mock.resolve(old), mock.resolve(new)) {
            (Some(old), Some(new)) => (old, new),
            _ => return Ok(false),
        };
        if old == new {
            return Ok(true);
        }
        Ok(mock.branches.values().any(|history| {
            let old_pos = history.iter().position(|c| *c == old);
            let new_pos = history.iter().position(|c| *c == new);
            matches!((old_pos, new_pos), (Some(o), Some(n)) if o <= n)
        }))
    }

    fn branches_containing(&self, repo: &str, reference: &str) -> Result<BTreeSet<String>> {
        let mock = match self.repo(repo)? {
            Some(mock) => mock,
            None => return Ok(BTreeSet::new()),
        };
        let sha = match mock.resolve(reference) {
            Some(sha) => sha,
            None => return Ok(BTreeSet::new()),
        };
        Ok(mock
            .branches
            .iter()
            .filter(|(_, history)| history.contains(&sha))
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn file_exists(&self, repo: &str, reference: &str, path: &str) -> Result<bool> {
        Ok(self
            .repo(repo)?
            .map(|r| r.resolve(reference).is_some() && r.files.contains_key(path))
            .unwrap_or(false))
    }

    fn read_file(&self, repo: &str, reference: &str, path: &str) -> Result<Option<String>> {
        Ok(self
            .repo(repo)?
            .filter(|r| r.resolve(reference).is_some())
            .and_then(|r| r.files.get(path).cloned()))
    }
}
