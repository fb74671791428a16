//! Next-version computation
//!
//! [`version_increment`] holds the arithmetic on version components and
//! the walk back through earlier series; [`planner`] turns a requested
//! release type into a complete new release for a deliverable, resolving
//! commits through [`crate::git::GitOps`].

pub mod planner;
pub mod version_increment;

pub use planner::{PlannedProject, ReleasePlan, ReleasePlanner};
pub use version_increment::{
    find_last_release, increment_milestone_version, increment_version, LastRelease, ReleaseType,
};
