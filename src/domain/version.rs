//! Version model: parsing, comparison, classification and canonical forms
//!
//! Three families of version strings appear in deliverable files:
//!
//! - ordinary versions, `X.Y.Z` with an optional pre-release component
//!   (`1.0.0.0b1`, `2.0.0.0rc2`) and an optional `.devN`;
//! - sentinel tags (`ocata-eol`, `pike-em`, `queens-last`), see
//!   [`crate::domain::tag`];
//! - legacy tags that predate the current rules (`v1.2`, `2013.1.1.2`).
//!
//! Validation is strict and flavor-specific ([`validate`]); comparison is
//! lenient ([`parse_lenient`]) so that old history never breaks a run.

use crate::domain::prerelease::{PreRelease, PreReleaseKind};
use crate::domain::tag::{SentinelKind, SentinelTag};
use crate::error::{ReleaseError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

/// Numbering scheme used to validate and canonicalize a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// pbr semantic versioning: `X.Y.Z[.0{a,b,rc}N][.devN]`
    Std,
    /// PEP 440 versions used by xstatic packages
    Xstatic,
    /// Puppet modules; std rules
    Puppet,
    /// npm packages; strict semver
    Nodejs,
    /// Python services and libraries; std rules
    Generic,
}

impl Flavor {
    /// Map a release type (`python-pypi`, `xstatic`, ...) to its flavor
    pub fn from_release_type(release_type: &str) -> Option<Self> {
        match release_type {
            "std" => Some(Flavor::Std),
            "xstatic" => Some(Flavor::Xstatic),
            "puppet" => Some(Flavor::Puppet),
            "nodejs" => Some(Flavor::Nodejs),
            "fuel" | "openstack-manuals" | "neutron" | "horizon" | "python-service"
            | "python-pypi" => Some(Flavor::Generic),
            _ => None,
        }
    }
}

/// An ordinary version number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<PreRelease>,
    pub dev: Option<u64>,
}

impl NumericVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        NumericVersion {
            major,
            minor,
            patch,
            pre: None,
            dev: None,
        }
    }

    pub fn with_pre(mut self, pre: PreRelease) -> Self {
        self.pre = Some(pre);
        self
    }

    /// Parse using the pbr rules that define the std flavor
    ///
    /// Accepts both the semver spelling (`1.0.0.0rc1`) and the pip spelling
    /// (`1.0.0rc1`) of a pre-release, and pads short versions (`1.0`).
    pub fn parse(version: &str) -> Result<Self> {
        if version.is_empty() {
            return Err(ReleaseError::version("Empty version string"));
        }

        let mut numbers: Vec<u64> = Vec::with_capacity(3);
        let mut pre: Option<PreRelease> = None;
        let mut dev: Option<u64> = None;

        for component in version.split('.') {
            if component.is_empty() {
                return Err(ReleaseError::version(format!(
                    "Empty component in version '{}'",
                    version
                )));
            }

            let all_digits = component.chars().all(|c| c.is_ascii_digit());
            let leading_digit = component.starts_with(|c: char| c.is_ascii_digit());

            if numbers.len() < 3 && pre.is_none() && dev.is_none() {
                if all_digits {
                    numbers.push(parse_number(component, version)?);
                    continue;
                }
                if leading_digit && !numbers.is_empty() {
                    // pip spelling: the pre-release is glued to the last number
                    let split_at = component
                        .find(|c: char| !c.is_ascii_digit())
                        .unwrap_or(component.len());
                    let (digits, marker) = component.split_at(split_at);
                    numbers.push(parse_number(digits, version)?);
                    pre = Some(PreRelease::parse(marker)?);
                    continue;
                }
            }

            if numbers.is_empty() {
                return Err(ReleaseError::version(format!(
                    "Version '{}' does not start with a number",
                    version
                )));
            }

            if let Some(counter) = component.strip_prefix("dev") {
                if dev.is_some() {
                    return Err(ReleaseError::version(format!(
                        "Version '{}' has more than one dev component",
                        version
                    )));
                }
                dev = Some(if counter.is_empty() {
                    0
                } else {
                    parse_number(counter, version)?
                });
                continue;
            }

            if numbers.len() == 3 && pre.is_none() && dev.is_none() && component.starts_with('0') {
                pre = Some(PreRelease::parse(component)?);
                continue;
            }

            return Err(ReleaseError::version(format!(
                "Unexpected component '{}' in version '{}'",
                component, version
            )));
        }

        numbers.resize(3, 0);
        Ok(NumericVersion {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
            dev,
        })
    }

    /// The numeric triple as strings, the form the increment engine uses
    pub fn release_parts(&self) -> Vec<String> {
        vec![
            self.major.to_string(),
            self.minor.to_string(),
            self.patch.to_string(),
        ]
    }

    // dev-only < pre-release < final, per triple
    fn stage(&self) -> u8 {
        match (self.pre, self.dev) {
            (None, Some(_)) => 0,
            (Some(_), _) => 1,
            (None, None) => 2,
        }
    }
}

fn parse_number(digits: &str, version: &str) -> Result<u64> {
    digits.parse::<u64>().map_err(|_| {
        ReleaseError::version(format!(
            "Invalid number '{}' in version '{}'",
            digits, version
        ))
    })
}

impl PartialOrd for NumericVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumericVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then(self.stage().cmp(&other.stage()))
            .then(self.pre.cmp(&other.pre))
            .then_with(|| match (self.dev, other.dev) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl fmt::Display for NumericVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = self.pre {
            write!(f, ".{}", pre)?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{}", dev)?;
        }
        Ok(())
    }
}

/// Result of lenient parsing: a number, or an opaque legacy tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedVersion {
    Numeric(NumericVersion),
    /// Anything the parser could not make sense of; sorts after every number
    Opaque(String),
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ParsedVersion::Numeric(a), ParsedVersion::Numeric(b)) => a.cmp(b),
            (ParsedVersion::Numeric(_), ParsedVersion::Opaque(_)) => Ordering::Less,
            (ParsedVersion::Opaque(_), ParsedVersion::Numeric(_)) => Ordering::Greater,
            (ParsedVersion::Opaque(a), ParsedVersion::Opaque(b)) => a.cmp(b),
        }
    }
}

/// Parse a version, repairing the common legacy mistakes
///
/// Leading `v` characters and stray `.` at either end are removed, and a
/// fourth all-numeric component is dropped. Never fails.
pub fn parse_lenient(version: &str) -> ParsedVersion {
    let cleaned = version.trim_start_matches('v').trim_matches('.');
    let mut parts: Vec<&str> = cleaned.split('.').collect();
    if parts.len() > 3 && !parts[3].is_empty() && parts[3].chars().all(|c| c.is_ascii_digit()) {
        tracing::warn!(
            version,
            "dropping fourth numeric component while parsing legacy version"
        );
        parts.truncate(3);
    }
    let candidate = parts.join(".");

    match NumericVersion::parse(&candidate) {
        Ok(parsed) => ParsedVersion::Numeric(parsed),
        Err(_) => ParsedVersion::Opaque(version.to_string()),
    }
}

/// Order two version strings, or `None` when either one is a sentinel tag
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    if SentinelTag::is_sentinel(a) || SentinelTag::is_sentinel(b) {
        return None;
    }
    Some(parse_lenient(a).cmp(&parse_lenient(b)))
}

/// Coarse class of a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Final,
    Alpha,
    Beta,
    ReleaseCandidate,
    EndOfLife,
    ExtendedMaintenance,
    Last,
}

impl Classification {
    pub fn is_pre_release(&self) -> bool {
        matches!(
            self,
            Classification::Alpha | Classification::Beta | Classification::ReleaseCandidate
        )
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(
            self,
            Classification::EndOfLife | Classification::ExtendedMaintenance | Classification::Last
        )
    }

    /// Position in the alpha, beta, rc, final progression
    pub fn progression_rank(&self) -> Option<u8> {
        match self {
            Classification::Alpha => Some(0),
            Classification::Beta => Some(1),
            Classification::ReleaseCandidate => Some(2),
            Classification::Final => Some(3),
            _ => None,
        }
    }

    pub fn pre_release_kind(&self) -> Option<PreReleaseKind> {
        match self {
            Classification::Alpha => Some(PreReleaseKind::Alpha),
            Classification::Beta => Some(PreReleaseKind::Beta),
            Classification::ReleaseCandidate => Some(PreReleaseKind::ReleaseCandidate),
            _ => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Final => "final release",
            Classification::Alpha => "alpha",
            Classification::Beta => "beta",
            Classification::ReleaseCandidate => "release candidate",
            Classification::EndOfLife => "end-of-life tag",
            Classification::ExtendedMaintenance => "extended-maintenance tag",
            Classification::Last => "last tag",
        };
        write!(f, "{}", name)
    }
}

/// Classify a version string
///
/// Sentinel suffixes are recognized first. Otherwise this is a plain
/// substring test for `a`, `b` and `rc`, in that order. It is not
/// position-aware, so a legacy tag containing one of those letters anywhere
/// is reported as a pre-release.
pub fn classify(version: &str) -> Classification {
    if let Some(tag) = SentinelTag::parse(version) {
        return match tag.kind {
            SentinelKind::EndOfLife => Classification::EndOfLife,
            SentinelKind::ExtendedMaintenance => Classification::ExtendedMaintenance,
            SentinelKind::Last => Classification::Last,
        };
    }
    if version.contains('a') {
        Classification::Alpha
    } else if version.contains('b') {
        Classification::Beta
    } else if version.contains("rc") {
        Classification::ReleaseCandidate
    } else {
        Classification::Final
    }
}

/// Whether the version looks like a pre-release
pub fn is_pre_release(version: &str) -> bool {
    classify(version).is_pre_release()
}

/// A reason a version string is not acceptable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    PreReleaseNotAllowed { version: String },
    UnknownReleaseType { release_type: String },
    Invalid { version: String, reason: String },
    NotCanonical { version: String, canonical: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::PreReleaseNotAllowed { version } => write!(
                f,
                "Version {} looks like a pre-release and the release model does not allow for it",
                version
            ),
            Violation::UnknownReleaseType { release_type } => write!(
                f,
                "Release Type '{}' not valid using 'std' instead",
                release_type
            ),
            Violation::Invalid { version, reason } => {
                write!(f, "Invalid version {}: {}", version, reason)
            }
            Violation::NotCanonical { version, canonical } => write!(
                f,
                "Version '{}' does not match canonical form '{}'",
                version, canonical
            ),
        }
    }
}

/// Canonical spelling of `version` under `flavor`
pub fn canonical_form(version: &str, flavor: Flavor) -> Result<String> {
    match flavor {
        Flavor::Std | Flavor::Puppet | Flavor::Generic => {
            NumericVersion::parse(version).map(|v| v.to_string())
        }
        Flavor::Xstatic => canonical_pep440(version),
        Flavor::Nodejs => semver::Version::parse(version)
            .map(|v| v.to_string())
            .map_err(|e| ReleaseError::version(e.to_string())),
    }
}

/// Check a version against a flavor and the release model's pre-release policy
pub fn validate(version: &str, flavor: Flavor, pre_release_allowed: bool) -> Vec<Violation> {
    let mut violations = Vec::new();

    if !pre_release_allowed && is_pre_release(version) {
        violations.push(Violation::PreReleaseNotAllowed {
            version: version.to_string(),
        });
    }

    match canonical_form(version, flavor) {
        Err(err) => violations.push(Violation::Invalid {
            version: version.to_string(),
            reason: err.to_string(),
        }),
        Ok(canonical) if canonical != version => violations.push(Violation::NotCanonical {
            version: version.to_string(),
            canonical,
        }),
        Ok(_) => {}
    }

    violations
}

/// Like [`validate`], resolving the flavor from a release type name
///
/// Unknown release types are reported and validated with the std rules.
pub fn validate_version(version: &str, release_type: &str, pre_release_allowed: bool) -> Vec<Violation> {
    match Flavor::from_release_type(release_type) {
        Some(flavor) => validate(version, flavor, pre_release_allowed),
        None => {
            let mut violations = vec![Violation::UnknownReleaseType {
                release_type: release_type.to_string(),
            }];
            violations.extend(validate(version, Flavor::Std, pre_release_allowed));
            violations
        }
    }
}

fn canonical_pep440(version: &str) -> Result<String> {
    let re = Regex::new(
        r"(?ix)^
        v?
        (?:(?P<epoch>\d+)!)?
        (?P<release>\d+(?:\.\d+)*)
        (?:[-_.]?(?P<pre_l>alpha|beta|preview|pre|rc|a|b|c)[-_.]?(?P<pre_n>\d+)?)?
        (?:-(?P<post_n1>\d+)|[-_.]?(?P<post_l>post|rev|r)[-_.]?(?P<post_n2>\d+)?)?
        (?:[-_.]?(?P<dev_l>dev)[-_.]?(?P<dev_n>\d+)?)?
        $",
    )
    .map_err(|e| ReleaseError::version(format!("Invalid PEP 440 pattern: {}", e)))?;

    let caps = re
        .captures(version.trim())
        .ok_or_else(|| ReleaseError::version(format!("Invalid version: '{}'", version)))?;

    let number = |name: &str| -> Result<u64> {
        match caps.name(name) {
            Some(m) => parse_number(m.as_str(), version),
            None => Ok(0),
        }
    };

    let mut canonical = String::new();
    let epoch = number("epoch")?;
    if epoch != 0 {
        canonical.push_str(&format!("{}!", epoch));
    }

    let release: Vec<String> = caps["release"]
        .split('.')
        .map(|part| parse_number(part, version).map(|n| n.to_string()))
        .collect::<Result<_>>()?;
    canonical.push_str(&release.join("."));

    if let Some(label) = caps.name("pre_l") {
        let marker = match label.as_str().to_lowercase().as_str() {
            "alpha" | "a" => "a",
            "beta" | "b" => "b",
            _ => "rc",
        };
        canonical.push_str(&format!("{}{}", marker, number("pre_n")?));
    }

    if caps.name("post_n1").is_some() {
        canonical.push_str(&format!(".post{}", number("post_n1")?));
    } else if caps.name("post_l").is_some() {
        canonical.push_str(&format!(".post{}", number("post_n2")?));
    }

    if caps.name("dev_l").is_some() {
        canonical.push_str(&format!(".dev{}", number("dev_n")?));
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let v = NumericVersion::parse("1.2.3").unwrap();
        assert_eq!(v, NumericVersion::new(1, 2, 3));
    }

    #[test]
    fn test_parse_semver_pre_release() {
        let v = NumericVersion::parse("2.0.0.0rc1").unwrap();
        assert_eq!(
            v.pre,
            Some(PreRelease::new(PreReleaseKind::ReleaseCandidate, 1))
        );
        assert_eq!(v.to_string(), "2.0.0.0rc1");
    }

    #[test]
    fn test_parse_pip_pre_release() {
        let v = NumericVersion::parse("2.0.0b3").unwrap();
        assert_eq!(v.to_string(), "2.0.0.0b3");
    }

    #[test]
    fn test_parse_short_and_dev() {
        assert_eq!(NumericVersion::parse("1.0").unwrap().to_string(), "1.0.0");
        assert_eq!(
            NumericVersion::parse("1.0.0.dev4").unwrap().to_string(),
            "1.0.0.dev4"
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(NumericVersion::parse("").is_err());
        assert!(NumericVersion::parse("v1.0.0").is_err());
        assert!(NumericVersion::parse("1.2.3.4").is_err());
        assert!(NumericVersion::parse("1..3").is_err());
        assert!(NumericVersion::parse("ocata-eol").is_err());
    }

    #[test]
    fn test_ordering_pre_releases_before_final() {
        let beta = NumericVersion::parse("2.0.0.0b2").unwrap();
        let rc = NumericVersion::parse("2.0.0.0rc1").unwrap();
        let final_release = NumericVersion::parse("2.0.0").unwrap();
        let dev = NumericVersion::parse("2.0.0.dev1").unwrap();
        assert!(dev < beta);
        assert!(beta < rc);
        assert!(rc < final_release);
        assert!(final_release < NumericVersion::parse("2.0.1").unwrap());
    }

    #[test]
    fn test_parse_lenient_repairs_legacy_tags() {
        assert_eq!(
            parse_lenient("v1.2.3"),
            ParsedVersion::Numeric(NumericVersion::new(1, 2, 3))
        );
        assert_eq!(
            parse_lenient(".1.2.3."),
            ParsedVersion::Numeric(NumericVersion::new(1, 2, 3))
        );
        assert_eq!(
            parse_lenient("2013.1.1.2"),
            ParsedVersion::Numeric(NumericVersion::new(2013, 1, 1))
        );
    }

    #[test]
    fn test_parse_lenient_falls_back_to_opaque() {
        let opaque = parse_lenient("juno-final");
        assert_eq!(opaque, ParsedVersion::Opaque("juno-final".to_string()));
        assert!(opaque > parse_lenient("999.0.0"));
    }

    #[test]
    fn test_compare_versions_exempts_sentinels() {
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Some(Ordering::Less));
        assert_eq!(compare_versions("ocata-eol", "1.0.0"), None);
        assert_eq!(compare_versions("1.0.0", "pike-em"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("1.0.0"), Classification::Final);
        assert_eq!(classify("1.0.0.0a1"), Classification::Alpha);
        assert_eq!(classify("1.0.0.0b2"), Classification::Beta);
        assert_eq!(classify("1.0.0.0rc1"), Classification::ReleaseCandidate);
        assert_eq!(classify("ocata-eol"), Classification::EndOfLife);
        assert_eq!(classify("pike-em"), Classification::ExtendedMaintenance);
        assert_eq!(classify("queens-last"), Classification::Last);
    }

    #[test]
    fn test_classify_substring_quirk() {
        // not position-aware: any "a" wins
        assert_eq!(classify("1.0.0.a-b"), Classification::Alpha);
    }

    #[test]
    fn test_validate_canonical_std() {
        assert!(validate("1.2.3", Flavor::Std, true).is_empty());
        assert!(validate("1.2.3.0rc1", Flavor::Generic, true).is_empty());
    }

    #[test]
    fn test_validate_not_canonical() {
        let violations = validate("1.2", Flavor::Std, true);
        assert_eq!(
            violations,
            vec![Violation::NotCanonical {
                version: "1.2".to_string(),
                canonical: "1.2.0".to_string()
            }]
        );

        let violations = validate("01.2.3", Flavor::Std, true);
        assert_eq!(violations.len(), 1);

        let violations = validate("1.2.3.0RC1", Flavor::Std, true);
        assert!(matches!(violations[0], Violation::NotCanonical { .. }));
    }

    #[test]
    fn test_validate_invalid() {
        let violations = validate("1.2.3.4", Flavor::Std, true);
        assert!(matches!(violations[0], Violation::Invalid { .. }));
    }

    #[test]
    fn test_validate_pre_release_not_allowed() {
        let violations = validate("1.2.3.0b1", Flavor::Std, false);
        assert_eq!(
            violations,
            vec![Violation::PreReleaseNotAllowed {
                version: "1.2.3.0b1".to_string()
            }]
        );
    }

    #[test]
    fn test_validate_xstatic() {
        assert!(validate("1.2.3.1", Flavor::Xstatic, true).is_empty());
        assert!(validate("1.0.0rc1", Flavor::Xstatic, true).is_empty());
        let violations = validate("1.0.0-beta.2", Flavor::Xstatic, true);
        assert_eq!(
            violations,
            vec![Violation::NotCanonical {
                version: "1.0.0-beta.2".to_string(),
                canonical: "1.0.0b2".to_string()
            }]
        );
    }

    #[test]
    fn test_validate_nodejs() {
        assert!(validate("1.2.3", Flavor::Nodejs, true).is_empty());
        assert!(matches!(
            validate("1.2", Flavor::Nodejs, true)[0],
            Violation::Invalid { .. }
        ));
    }

    #[test]
    fn test_validate_version_unknown_release_type() {
        let violations = validate_version("1.0.0", "not-a-type", true);
        assert_eq!(
            violations,
            vec![Violation::UnknownReleaseType {
                release_type: "not-a-type".to_string()
            }]
        );
    }

    #[test]
    fn test_canonical_form_validates_cleanly() {
        let inputs = [
            ("1.0", Flavor::Std),
            ("2.0.0rc2", Flavor::Generic),
            ("3.1.0b1", Flavor::Puppet),
            ("1.0.0-alpha-3", Flavor::Xstatic),
            ("1.10.2.post1", Flavor::Xstatic),
            ("4.0.0", Flavor::Nodejs),
        ];
        for (input, flavor) in inputs {
            let canonical = canonical_form(input, flavor).unwrap();
            assert!(
                validate(&canonical, flavor, true).is_empty(),
                "{} canonicalized to {} should validate",
                input,
                canonical
            );
        }
    }
}
