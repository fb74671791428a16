use crate::error::{ReleaseError, Result};
use crate::git::{local_branch_name, GitOps};
use git2::{BranchType, Oid, Repository as Git2Repo};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Clones of the repositories under validation, kept in a scratch directory
///
/// Each repository is cloned from `<base_url>/<repo>` the first time it is
/// asked about and reused afterwards.
pub struct Git2Workspace {
    workdir: PathBuf,
    base_url: String,
    repos: Mutex<HashMap<String, Git2Repo>>,
}

impl Git2Workspace {
    pub fn new(workdir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Git2Workspace {
            workdir: workdir.into(),
            base_url: base_url.into(),
            repos: Mutex::new(HashMap::new()),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn with_repo<T>(&self, repo: &str, f: impl FnOnce(&Git2Repo) -> Result<T>) -> Result<T> {
        let mut repos = self
            .repos
            .lock()
            .map_err(|_| ReleaseError::collaborator("git workspace lock poisoned"))?;

        if !repos.contains_key(repo) {
            let opened = self.open_or_clone(repo)?;
            repos.insert(repo.to_string(), opened);
        }

        match repos.get(repo) {
            Some(opened) => f(opened),
            None => Err(ReleaseError::collaborator(format!(
                "repository {} is not available",
                repo
            ))),
        }
    }

    fn open_or_clone(&self, repo: &str) -> Result<Git2Repo> {
        let path = self.workdir.join(repo);
        if path.join(".git").exists() {
            tracing::debug!(repo, "reusing existing clone");
            return Ok(Git2Repo::open(&path)?);
        }

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), repo);
        tracing::info!(repo, url = %url, "cloning");
        Git2Repo::clone(&url, &path).map_err(|e| {
            ReleaseError::collaborator(format!("could not clone {}: {}", url, e))
        })
    }
}

fn resolve(repo: &Git2Repo, reference: &str) -> Result<Option<Oid>> {
    let candidates = [
        reference.to_string(),
        format!("refs/tags/{}", reference),
        format!("origin/{}", reference),
    ];
    for candidate in candidates.iter() {
        match repo.revparse_single(candidate) {
            Ok(object) => {
                let commit = object.peel_to_commit()?;
                return Ok(Some(commit.id()));
            }
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::NotFound
                        | git2::ErrorCode::InvalidSpec
                        | git2::ErrorCode::Ambiguous
                ) =>
            {
                continue
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

fn is_same_or_descendant(repo: &Git2Repo, ancestor: Oid, commit: Oid) -> Result<bool> {
    if ancestor == commit {
        return Ok(true);
    }
    Ok(repo.graph_descendant_of(commit, ancestor)?)
}

impl GitOps for Git2Workspace {
    fn commit_exists(&self, repo: &str, reference: &str) -> Result<bool> {
        self.with_repo(repo, |r| Ok(resolve(r, reference)?.is_some()))
    }

    fn checkout_ref(&self, repo: &str, reference: &str) -> Result<()> {
        self.with_repo(repo, |r| {
            let oid = resolve(r, reference)?.ok_or_else(|| {
                ReleaseError::collaborator(format!("{} has no ref {}", repo, reference))
            })?;
            let object = r.find_object(oid, None)?;
            r.checkout_tree(&object, Some(git2::build::CheckoutBuilder::new().force()))?;
            r.set_head_detached(oid)?;
            Ok(())
        })
    }

    fn sha_for_tag(&self, repo: &str, reference: &str) -> Result<Option<String>> {
        self.with_repo(repo, |r| Ok(resolve(r, reference)?.map(|oid| oid.to_string())))
    }

    fn branch_exists(&self, repo: &str, branch: &str) -> Result<bool> {
        self.with_repo(repo, |r| {
            let branch = local_branch_name(branch);
            let remote = format!("refs/remotes/origin/{}", branch);
            let local = format!("refs/heads/{}", branch);
            Ok(r.find_reference(&remote).is_ok() || r.find_reference(&local).is_ok())
        })
    }

    fn check_ancestry(&self, repo: &str, old: &str, new: &str) -> Result<bool> {
        self.with_repo(repo, |r| {
            match (resolve(r, old)?, resolve(r, new)?) {
                (Some(old), Some(new)) => is_same_or_descendant(r, old, new),
                _ => Ok(false),
            }
        })
    }

    fn branches_containing(&self, repo: &str, reference: &str) -> Result<BTreeSet<String>> {
        self.with_repo(repo, |r| {
            let target = match resolve(r, reference)? {
                Some(oid) => oid,
                None => return Ok(BTreeSet::new()),
            };

            let mut containing = BTreeSet::new();
            for entry in r.branches(None)? {
                let (branch, kind) = entry?;
                let name = match branch.name()? {
                    Some(name) => name.to_string(),
                    None => continue,
                };
                if kind == BranchType::Remote && name.ends_with("/HEAD") {
                    continue;
                }
                let tip = match branch.get().target() {
                    Some(tip) => tip,
                    None => continue,
                };
                if is_same_or_descendant(r, target, tip)? {
                    containing.insert(local_branch_name(&name).to_string());
                }
            }
            Ok(containing)
        })
    }

    fn file_exists(&self, repo: &str, reference: &str, path: &str) -> Result<bool> {
        self.with_repo(repo, |r| {
            let oid = match resolve(r, reference)? {
                Some(oid) => oid,
                None => return Ok(false),
            };
            let tree = r.find_commit(oid)?.tree()?;
            Ok(tree.get_path(Path::new(path)).is_ok())
        })
    }

    fn read_file(&self, repo: &str, reference: &str, path: &str) -> Result<Option<String>> {
        self.with_repo(repo, |r| {
            let oid = match resolve(r, reference)? {
                Some(oid) => oid,
                None => return Ok(None),
            };
            let tree = r.find_commit(oid)?.tree()?;
            let entry = match tree.get_path(Path::new(path)) {
                Ok(entry) => entry,
                Err(_) => return Ok(None),
            };
            let object = entry.to_object(r)?;
            Ok(object
                .as_blob()
                .map(|blob| String::from_utf8_lossy(blob.content()).into_owned()))
        })
    }
}

/// Deliverable files touched by the most recent commit of the repository
/// containing `repo_root`
///
/// Deleted files are included; callers skip paths that no longer exist.
pub fn modified_deliverable_files(repo_root: &Path) -> Result<Vec<PathBuf>> {
    let repo = Git2Repo::discover(repo_root)?;
    let workdir = repo
        .workdir()
        .ok_or_else(|| ReleaseError::collaborator("repository has no working tree"))?
        .to_path_buf();

    let head = repo.head()?.peel_to_commit()?;
    let head_tree = head.tree()?;
    let parent_tree = match head.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => None,
    };

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&head_tree), None)?;
    let mut files = BTreeSet::new();
    for delta in diff.deltas() {
        let path = delta.new_file().path().or_else(|| delta.old_file().path());
        if let Some(path) = path {
            let is_deliverable = path.starts_with("deliverables")
                && path.extension().map(|e| e == "yaml").unwrap_or(false);
            if is_deliverable {
                files.insert(workdir.join(path));
            }
        }
    }
    Ok(files.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn commit_file(repo: &Git2Repo, path: &str, content: &str, message: &str) -> Oid {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let full = workdir.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(&full, content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_workspace_answers_from_existing_clone() {
        let workdir = TempDir::new().unwrap();
        let repo_path = workdir.path().join("openstack/demo");
        fs::create_dir_all(&repo_path).unwrap();
        let repo = Git2Repo::init(&repo_path).unwrap();

        let first = commit_file(&repo, ".gitreview", "[gerrit]\n", "first");
        let second = commit_file(&repo, "README", "demo\n", "second");
        let obj = repo.find_object(first, None).unwrap();
        repo.tag_lightweight("1.0.0", &obj, false).unwrap();

        let ws = Git2Workspace::new(workdir.path(), "https://example.invalid");
        let repo_name = "openstack/demo";

        assert!(ws.commit_exists(repo_name, &second.to_string()).unwrap());
        assert!(ws.commit_exists(repo_name, "1.0.0").unwrap());
        assert!(!ws.commit_exists(repo_name, "2.0.0").unwrap());
        assert_eq!(
            ws.sha_for_tag(repo_name, "1.0.0").unwrap(),
            Some(first.to_string())
        );
        assert!(ws
            .check_ancestry(repo_name, "1.0.0", &second.to_string())
            .unwrap());
        assert!(!ws
            .check_ancestry(repo_name, &second.to_string(), "1.0.0")
            .unwrap());
        assert!(ws.file_exists(repo_name, "1.0.0", ".gitreview").unwrap());
        assert!(!ws.file_exists(repo_name, "1.0.0", "README").unwrap());
        assert_eq!(
            ws.read_file(repo_name, "1.0.0", ".gitreview").unwrap().as_deref(),
            Some("[gerrit]\n")
        );
        assert_eq!(ws.read_file(repo_name, "1.0.0", "README").unwrap(), None);
    }

    #[test]
    fn test_modified_deliverable_files() {
        let dir = TempDir::new().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        commit_file(&repo, "README", "x\n", "initial");
        commit_file(&repo, "deliverables/2024.1/nova.yaml", "team: nova\n", "add nova");

        let files = modified_deliverable_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("deliverables/2024.1/nova.yaml"));
    }
}
