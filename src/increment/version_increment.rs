use crate::domain::deliverable::{Deliverable, Release};
use crate::domain::prerelease::{PreRelease, PreReleaseKind};
use crate::domain::series::compare_series;
use crate::domain::version::NumericVersion;
use crate::error::{ReleaseError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Kind of release requested from the release-creation tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseType {
    Bugfix,
    Feature,
    Major,
    Milestone,
    Rc,
    /// Re-tag the same commits with a feature increment
    Procedural,
    Eol,
    Em,
    /// Re-tag the commits of the previous release with a patch increment
    Releasefix,
}

impl ReleaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseType::Bugfix => "bugfix",
            ReleaseType::Feature => "feature",
            ReleaseType::Major => "major",
            ReleaseType::Milestone => "milestone",
            ReleaseType::Rc => "rc",
            ReleaseType::Procedural => "procedural",
            ReleaseType::Eol => "eol",
            ReleaseType::Em => "em",
            ReleaseType::Releasefix => "releasefix",
        }
    }

    /// Types that point new tags at the commits of the previous release
    pub fn reuses_previous_commits(&self) -> bool {
        matches!(
            self,
            ReleaseType::Procedural | ReleaseType::Releasefix | ReleaseType::Eol | ReleaseType::Em
        )
    }

    pub fn is_pre_release(&self) -> bool {
        matches!(self, ReleaseType::Milestone | ReleaseType::Rc)
    }
}

impl FromStr for ReleaseType {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bugfix" => Ok(ReleaseType::Bugfix),
            "feature" => Ok(ReleaseType::Feature),
            "major" => Ok(ReleaseType::Major),
            "milestone" => Ok(ReleaseType::Milestone),
            "rc" => Ok(ReleaseType::Rc),
            "procedural" => Ok(ReleaseType::Procedural),
            "eol" => Ok(ReleaseType::Eol),
            "em" => Ok(ReleaseType::Em),
            "releasefix" => Ok(ReleaseType::Releasefix),
            other => Err(ReleaseError::increment(format!(
                "Unknown release type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn parse_part(part: &str) -> Result<u64> {
    part.parse::<u64>().map_err(|_| {
        ReleaseError::increment(format!("'{}' is not a numeric version component", part))
    })
}

/// Increment the numeric triple of a version
///
/// `increment` gives the amount added at each position. Positions to the
/// right of the first non-zero increment are reset to `0`. Short versions
/// are padded and anything after the triple is dropped.
pub fn increment_version<S: AsRef<str>>(
    old_version: &[S],
    increment: (u64, u64, u64),
) -> Result<Vec<String>> {
    let mut parts: Vec<&str> = old_version.iter().map(|p| p.as_ref()).take(3).collect();
    while parts.len() < 3 {
        parts.push("0");
    }

    let increments = [increment.0, increment.1, increment.2];
    let mut clear = false;
    let mut new_parts = Vec::with_capacity(3);
    for (current, inc) in parts.iter().zip(increments.iter()) {
        if clear {
            new_parts.push("0".to_string());
        } else {
            new_parts.push((parse_part(current)? + inc).to_string());
            if *inc > 0 {
                clear = true;
            }
        }
    }
    Ok(new_parts)
}

// accepts both `1.0.0.0b1` and the pip spelling `1.0.0b1`
fn split_pre_release<S: AsRef<str>>(old_version: &[S]) -> Result<(Vec<String>, Option<PreRelease>)> {
    let joined = old_version
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(".");
    let parsed = NumericVersion::parse(&joined)?;
    Ok((parsed.release_parts(), parsed.pre))
}

/// Advance the pre-release suffix of a version
///
/// `milestone` turns `0bN` into `0bN+1` and starts `0b1` on a final
/// version or an alpha; `rc` starts `0rc1` after a beta, alpha or final
/// version and turns `0rcN` into `0rcN+1`. The numeric triple is never
/// changed here.
pub fn increment_milestone_version<S: AsRef<str>>(
    old_version: &[S],
    release_type: ReleaseType,
) -> Result<Vec<String>> {
    let (mut parts, pre) = split_pre_release(old_version)?;

    let next = match (release_type, pre) {
        (ReleaseType::Milestone, Some(pre)) if pre.kind == PreReleaseKind::Beta => pre.next(),
        (ReleaseType::Milestone, Some(pre)) if pre.kind == PreReleaseKind::ReleaseCandidate => {
            return Err(ReleaseError::increment(
                "cannot tag a milestone after a release candidate",
            ))
        }
        (ReleaseType::Milestone, _) => PreRelease::new(PreReleaseKind::Beta, 1),
        (ReleaseType::Rc, Some(pre)) if pre.kind == PreReleaseKind::ReleaseCandidate => pre.next(),
        (ReleaseType::Rc, _) => PreRelease::new(PreReleaseKind::ReleaseCandidate, 1),
        (other, _) => {
            return Err(ReleaseError::increment(format!(
                "'{}' is not a milestone release type",
                other
            )))
        }
    };

    parts.push(next.to_string());
    Ok(parts)
}

/// The release a new version is computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastRelease {
    /// Series the release was found in
    pub series: String,
    /// Newest release that is not a sentinel tag
    pub release: Release,
    /// Newest release when it is a sentinel tag
    pub sentinel: Option<Release>,
    /// Number of series without releases walked before finding one
    pub depth: u64,
}

impl LastRelease {
    /// Minor increment to apply for a feature release
    pub fn feature_increment(&self) -> u64 {
        self.depth.max(1)
    }

    pub fn version_parts(&self) -> Vec<String> {
        self.release.version.split('.').map(str::to_string).collect()
    }
}

/// Find the release to increment from
///
/// `history` holds every copy of one deliverable. The walk starts at
/// `series` and goes back in time, counting series with no releases.
pub fn find_last_release(
    history: &[&Deliverable],
    series: &str,
    release_type: ReleaseType,
) -> Result<LastRelease> {
    let mut candidates: Vec<&Deliverable> = history
        .iter()
        .copied()
        .filter(|d| compare_series(d.series(), series) != Ordering::Greater)
        .collect();
    candidates.sort_by(|a, b| compare_series(b.series(), a.series()));

    if candidates.first().map(|d| d.series()) != Some(series) {
        return Err(ReleaseError::increment(format!(
            "no deliverable file for series {}",
            series
        )));
    }

    let mut depth = 0;
    for deliv in candidates {
        if !deliv.is_released() {
            tracing::info!(series = deliv.series(), "no releases yet");
            if release_type == ReleaseType::Bugfix {
                return Err(ReleaseError::increment(
                    "The first release for a series must be at least a feature release \
                     to allow for stable releases from the previous series.",
                ));
            }
            depth += 1;
            continue;
        }

        let latest = deliv.latest_release().cloned();
        let ordinary = deliv.latest_ordinary_release().cloned().ok_or_else(|| {
            ReleaseError::increment(format!(
                "{} has only sentinel releases in {}",
                deliv.name(),
                deliv.series()
            ))
        })?;
        let sentinel = latest.filter(|r| r.is_sentinel());

        return Ok(LastRelease {
            series: deliv.series().to_string(),
            release: ordinary,
            sentinel,
            depth,
        });
    }

    Err(ReleaseError::increment(
        "Could not determine previous version: no releases in any series",
    ))
}
