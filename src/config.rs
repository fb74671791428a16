use crate::domain::series::default_closed_series;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Represents the complete configuration for release-guard.
///
/// Contains the release layout, where repositories are cloned from, and the
/// optional governance and CI data files.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub release: ReleaseConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub governance: GovernanceConfig,

    #[serde(default)]
    pub ci: CiConfig,
}

fn default_deliverables_dir() -> PathBuf {
    PathBuf::from("deliverables")
}

fn default_base_url() -> String {
    "https://opendev.org".to_string()
}

/// Series and file layout settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    /// Series under development; derived from the series status data when absent
    #[serde(default)]
    pub current_series: Option<String>,

    #[serde(default = "default_closed_series")]
    pub closed_series: Vec<String>,

    #[serde(default = "default_deliverables_dir")]
    pub deliverables_dir: PathBuf,

    #[serde(default)]
    pub series_status_file: Option<PathBuf>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            current_series: None,
            closed_series: default_closed_series(),
            deliverables_dir: default_deliverables_dir(),
            series_status_file: None,
        }
    }
}

impl ReleaseConfig {
    pub fn is_closed(&self, series: &str) -> bool {
        self.closed_series.iter().any(|s| s == series)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    /// Repositories are cloned from `<base_url>/<repo>`
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct GovernanceConfig {
    #[serde(default)]
    pub projects_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct CiConfig {
    #[serde(default)]
    pub job_templates_file: Option<PathBuf>,
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `releases.toml` in current directory
/// 3. `.releases.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Errors
/// Fails if a file exists but cannot be read or parsed.
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)?
    } else if Path::new("./releases.toml").exists() {
        fs::read_to_string("./releases.toml")?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(".releases.toml");
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    tracing::debug!("parsing configuration");
    let config: Config = toml::from_str(&config_str)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.git.base_url, "https://opendev.org");
        assert_eq!(config.release.deliverables_dir, PathBuf::from("deliverables"));
        assert!(config.release.is_closed("mitaka"));
        assert!(!config.release.is_closed("newton"));
        assert!(config.governance.projects_file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[release]\ncurrent_series = \"2024.1\"\n").unwrap();
        assert_eq!(config.release.current_series.as_deref(), Some("2024.1"));
        assert!(config.release.is_closed("austin"));
        assert_eq!(config.git.base_url, "https://opendev.org");
    }

    #[test]
    fn test_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }
}
