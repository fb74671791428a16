//! Domain logic - release metadata independent of git, governance and CI

pub mod branch;
pub mod deliverable;
pub mod prerelease;
pub mod series;
pub mod tag;
pub mod version;

pub use branch::{Branch, BranchLocation, BranchPrefix, StableBranchType};
pub use deliverable::{
    Deliverable, DeliverableFile, DeliverableIndex, ProjectData, Release, ReleaseData,
    ReleaseModel, ReleaseProject, Repo, RepoSettings,
};
pub use prerelease::{PreRelease, PreReleaseKind};
pub use series::{SeriesInfo, SeriesStatus, StableStatus};
pub use tag::{SentinelKind, SentinelTag};
pub use version::{Classification, Flavor, NumericVersion, ParsedVersion, Violation};
