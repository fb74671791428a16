//! Git operations abstraction layer
//!
//! Validation never touches git directly. It asks questions through the
//! [`GitOps`] trait, which names repositories by their hosting path
//! (`openstack/nova`) and references by anything git can resolve: a SHA,
//! a tag such as `29.0.0`, or a branch such as `origin/stable/2024.1`.
//!
//! - [`repository::Git2Workspace`]: clones repositories on demand with `git2`
//! - [`mock::MockGit`]: in-memory repositories for tests

pub mod mock;
pub mod repository;

pub use mock::MockGit;
pub use repository::{modified_deliverable_files, Git2Workspace};

use crate::error::Result;
use std::collections::BTreeSet;

/// Read-only questions about the repositories of a deliverable
///
/// All implementors must be `Send + Sync`. Lookups of something that does
/// not exist are answered with `Ok(false)` / `Ok(None)`; `Err` is reserved
/// for failures to reach or read a repository.
pub trait GitOps: Send + Sync {
    /// Whether `reference` resolves to a commit in `repo`
    fn commit_exists(&self, repo: &str, reference: &str) -> Result<bool>;

    /// Make `reference` the checked-out state of `repo`
    fn checkout_ref(&self, repo: &str, reference: &str) -> Result<()>;

    /// SHA of the commit `reference` points at, if any
    fn sha_for_tag(&self, repo: &str, reference: &str) -> Result<Option<String>>;

    /// Whether a branch exists locally or on `origin`
    ///
    /// `branch` is a full name such as `stable/2024.1` or `master`.
    fn branch_exists(&self, repo: &str, branch: &str) -> Result<bool>;

    /// Whether `new` is `old` or one of its descendants
    fn check_ancestry(&self, repo: &str, old: &str, new: &str) -> Result<bool>;

    /// Names of branches whose history includes `reference`, without any
    /// `origin/` prefix
    fn branches_containing(&self, repo: &str, reference: &str) -> Result<BTreeSet<String>>;

    /// Whether `path` exists in the tree at `reference`
    fn file_exists(&self, repo: &str, reference: &str, path: &str) -> Result<bool>;

    /// Contents of `path` at `reference`, `None` when either is missing
    fn read_file(&self, repo: &str, reference: &str, path: &str) -> Result<Option<String>>;
}

/// Strip a leading `origin/` or `remotes/origin/`
pub fn local_branch_name(name: &str) -> &str {
    name.strip_prefix("remotes/origin/")
        .or_else(|| name.strip_prefix("origin/"))
        .unwrap_or(name)
}
