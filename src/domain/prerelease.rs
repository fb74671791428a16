//! Pre-release suffixes used by OpenStack-style versions
//!
//! A pre-release is written as an extra dotted component after the numeric
//! triple: `1.0.0.0b2`, `2.0.0.0rc1`. The leading `0` keeps the component
//! numeric-first so that pbr-style tooling sorts it before the final release.
//! The pip spelling without the leading `0` (`1.0.0b2`) is also understood
//! by the parser.

use crate::error::{ReleaseError, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Pre-release identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseKind {
    /// Alpha pre-release (`a`)
    Alpha,
    /// Beta pre-release (`b`), produced by milestones
    Beta,
    /// Release candidate (`rc`)
    ReleaseCandidate,
}

impl PreReleaseKind {
    /// The short marker written into version strings
    pub fn marker(&self) -> &'static str {
        match self {
            PreReleaseKind::Alpha => "a",
            PreReleaseKind::Beta => "b",
            PreReleaseKind::ReleaseCandidate => "rc",
        }
    }
}

impl FromStr for PreReleaseKind {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "alpha" | "a" => Ok(PreReleaseKind::Alpha),
            "beta" | "b" => Ok(PreReleaseKind::Beta),
            "rc" | "c" => Ok(PreReleaseKind::ReleaseCandidate),
            other => Err(ReleaseError::version(format!(
                "Invalid pre-release identifier: '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PreReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreReleaseKind::Alpha => write!(f, "alpha"),
            PreReleaseKind::Beta => write!(f, "beta"),
            PreReleaseKind::ReleaseCandidate => write!(f, "release candidate"),
        }
    }
}

/// Pre-release marker with its iteration number
///
/// # Examples
/// - "0b1" -> PreRelease { kind: Beta, number: 1 }
/// - "0rc3" -> PreRelease { kind: ReleaseCandidate, number: 3 }
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u64,
}

impl PreRelease {
    pub fn new(kind: PreReleaseKind, number: u64) -> Self {
        PreRelease { kind, number }
    }

    /// Parse a pre-release component such as `0b2`, `0rc1` or `rc1`
    pub fn parse(component: &str) -> Result<Self> {
        let body = component.strip_prefix('0').unwrap_or(component);
        let split_at = body
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| {
                ReleaseError::version(format!(
                    "Pre-release '{}' has no iteration number",
                    component
                ))
            })?;
        let (marker, digits) = body.split_at(split_at);
        if marker.is_empty() {
            return Err(ReleaseError::version(format!(
                "Pre-release '{}' has no identifier",
                component
            )));
        }
        let kind = marker.parse::<PreReleaseKind>()?;
        let number = digits.parse::<u64>().map_err(|_| {
            ReleaseError::version(format!("Invalid iteration number: '{}'", digits))
        })?;

        Ok(PreRelease { kind, number })
    }

    /// The same kind with the iteration number incremented
    pub fn next(&self) -> Self {
        PreRelease {
            kind: self.kind,
            number: self.number + 1,
        }
    }
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then(self.number.cmp(&other.number))
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0{}{}", self.kind.marker(), self.number)
    }
}
