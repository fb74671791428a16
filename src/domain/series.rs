//! Release series: ordering and lifecycle status
//!
//! Series are totally ordered. The legacy code names `austin` through `zed`
//! come first, then the `YYYY.N` names (two per year, starting with
//! `2023.1`). The pseudo-series `independent` sorts after everything.

use crate::error::{ReleaseError, Result};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Name of the pseudo-series holding independently released deliverables
pub const INDEPENDENT: &str = "independent";

const LEGACY_SERIES: [&str; 26] = [
    "austin", "bexar", "cactus", "diablo", "essex", "folsom", "grizzly", "havana", "icehouse",
    "juno", "kilo", "liberty", "mitaka", "newton", "ocata", "pike", "queens", "rocky", "stein",
    "train", "ussuri", "victoria", "wallaby", "xena", "yoga", "zed",
];

/// Series that are permanently closed and never validated
pub fn default_closed_series() -> Vec<String> {
    LEGACY_SERIES[..13].iter().map(|s| s.to_string()).collect()
}

/// Sort key for a series name
///
/// Unknown alphabetic names are placed after the legacy list by their first
/// letter; names that fit no scheme sort just before `independent`.
pub fn series_sort_key(name: &str) -> u64 {
    let lower = name.to_ascii_lowercase();
    if lower == INDEPENDENT {
        return u64::MAX;
    }
    if let Some(idx) = LEGACY_SERIES.iter().position(|s| *s == lower) {
        return idx as u64;
    }
    if let Some((year, release)) = lower.split_once('.') {
        if let (Ok(year), Ok(release)) = (year.parse::<u64>(), release.parse::<u64>()) {
            if year >= 2023 && release >= 1 {
                // stays below the keys of odd names and `independent`
                return (year - 2023)
                    .saturating_mul(2)
                    .saturating_add(release.saturating_add(25))
                    .min(u64::MAX - 2);
            }
        }
    }
    match lower.chars().next() {
        Some(c) if c.is_ascii_lowercase() => 26 + (c as u64 - 'a' as u64),
        _ => u64::MAX - 1,
    }
}

/// Compare two series names chronologically
pub fn compare_series(a: &str, b: &str) -> Ordering {
    series_sort_key(a)
        .cmp(&series_sort_key(b))
        .then_with(|| a.cmp(b))
}

/// Stable-maintenance phase of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StableStatus {
    Development,
    Maintained,
    ExtendedMaintenance,
    Unmaintained,
    EndOfLife,
}

impl StableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StableStatus::Development => "development",
            StableStatus::Maintained => "maintained",
            StableStatus::ExtendedMaintenance => "extended maintenance",
            StableStatus::Unmaintained => "unmaintained",
            StableStatus::EndOfLife => "end of life",
        }
    }

    /// Only development and maintained series accept ordinary releases
    pub fn allows_releases(&self) -> bool {
        matches!(self, StableStatus::Development | StableStatus::Maintained)
    }
}

impl FromStr for StableStatus {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" => Ok(StableStatus::Development),
            "maintained" => Ok(StableStatus::Maintained),
            "extended maintenance" | "extended-maintenance" => {
                Ok(StableStatus::ExtendedMaintenance)
            }
            "unmaintained" => Ok(StableStatus::Unmaintained),
            "end of life" | "end-of-life" | "eol" => Ok(StableStatus::EndOfLife),
            other => Err(ReleaseError::config(format!(
                "Unknown stable status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for StableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SeriesEntry {
    name: String,
    status: String,
    #[serde(default)]
    initial_release: Option<String>,
    #[serde(default)]
    eol_date: Option<String>,
}

/// Lifecycle information for one series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesInfo {
    pub name: String,
    pub status: StableStatus,
    pub initial_release: Option<String>,
    pub eol_date: Option<String>,
}

impl SeriesInfo {
    pub fn new(name: impl Into<String>, status: StableStatus) -> Self {
        SeriesInfo {
            name: name.into(),
            status,
            initial_release: None,
            eol_date: None,
        }
    }
}

/// Status of every known series
///
/// `independent` is always present with status `development`. Series that
/// are not listed are treated as under development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesStatus {
    series: BTreeMap<String, SeriesInfo>,
}

impl SeriesStatus {
    pub fn from_entries(entries: impl IntoIterator<Item = SeriesInfo>) -> Self {
        let mut series: BTreeMap<String, SeriesInfo> = entries
            .into_iter()
            .map(|info| (info.name.clone(), info))
            .collect();
        series
            .entry(INDEPENDENT.to_string())
            .or_insert_with(|| SeriesInfo::new(INDEPENDENT, StableStatus::Development));
        SeriesStatus { series }
    }

    /// Parse the `series_status.yaml` list format
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let entries: Vec<SeriesEntry> = serde_yaml::from_str(yaml)?;
        let infos = entries
            .into_iter()
            .map(|entry| {
                Ok(SeriesInfo {
                    status: entry.status.parse()?,
                    name: entry.name,
                    initial_release: entry.initial_release,
                    eol_date: entry.eol_date,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_entries(infos))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn get(&self, name: &str) -> Option<&SeriesInfo> {
        self.series.get(name)
    }

    pub fn status_of(&self, name: &str) -> StableStatus {
        self.get(name)
            .map(|info| info.status)
            .unwrap_or(StableStatus::Development)
    }

    /// Known series names, oldest first
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.series.keys().map(|s| s.as_str()).collect();
        names.sort_by(|a, b| compare_series(a, b));
        names
    }

    /// Newest series under development, ignoring `independent`
    pub fn current_series(&self) -> Option<String> {
        self.series
            .values()
            .filter(|info| info.name != INDEPENDENT)
            .filter(|info| info.status == StableStatus::Development)
            .max_by(|a, b| compare_series(&a.name, &b.name))
            .map(|info| info.name.clone())
    }
}

impl Default for SeriesStatus {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}
