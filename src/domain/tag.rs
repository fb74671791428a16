use std::fmt;

/// Kind of a sentinel tag that marks a stable-maintenance transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentinelKind {
    /// `<series>-eol`: the branch reached End Of Life
    EndOfLife,
    /// `<series>-em`: the branch entered Extended Maintenance
    ExtendedMaintenance,
    /// `<series>-last`: final tag before a maintenance branch is closed
    Last,
}

impl SentinelKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            SentinelKind::EndOfLife => "eol",
            SentinelKind::ExtendedMaintenance => "em",
            SentinelKind::Last => "last",
        }
    }
}

impl fmt::Display for SentinelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// A sentinel tag such as `ocata-eol`
///
/// Sentinels are recognized by suffix only; they never go through the
/// version parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelTag {
    pub series: String,
    pub kind: SentinelKind,
}

impl SentinelTag {
    pub fn new(series: impl Into<String>, kind: SentinelKind) -> Self {
        SentinelTag {
            series: series.into(),
            kind,
        }
    }

    /// Recognize `<series>-eol`, `<series>-em` and `<series>-last`
    pub fn parse(version: &str) -> Option<Self> {
        let (series, suffix) = version.rsplit_once('-')?;
        let kind = match suffix {
            "eol" => SentinelKind::EndOfLife,
            "em" => SentinelKind::ExtendedMaintenance,
            "last" => SentinelKind::Last,
            _ => return None,
        };
        Some(SentinelTag {
            series: series.to_string(),
            kind,
        })
    }

    /// Whether `version` is any kind of sentinel tag
    pub fn is_sentinel(version: &str) -> bool {
        Self::parse(version).is_some()
    }
}

impl fmt::Display for SentinelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.series, self.kind)
    }
}
