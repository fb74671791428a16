use thiserror::Error;

/// Unified error type for release-guard operations
///
/// Business-rule violations found while validating a deliverable are never
/// reported through this type; they are recorded as findings on the
/// validation context. This type covers broken input, unreachable
/// collaborators and programming errors.
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Deliverable error: {0}")]
    Deliverable(String),

    #[error("Cannot compute release: {0}")]
    Increment(String),

    #[error("Collaborator lookup failed: {0}")]
    Collaborator(String),

    #[error("Validation aborted: {0}")]
    Aborted(String),
}

/// Convenience type alias for Results in release-guard
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::Version(msg.into())
    }

    /// Create a deliverable data error with context
    pub fn deliverable(msg: impl Into<String>) -> Self {
        ReleaseError::Deliverable(msg.into())
    }

    /// Create a version-increment error with context
    pub fn increment(msg: impl Into<String>) -> Self {
        ReleaseError::Increment(msg.into())
    }

    /// Create an error for a failed git, governance or CI lookup
    pub fn collaborator(msg: impl Into<String>) -> Self {
        ReleaseError::Collaborator(msg.into())
    }

    /// Create the error raised in debug mode on the first recorded error
    pub fn aborted(msg: impl Into<String>) -> Self {
        ReleaseError::Aborted(msg.into())
    }
}
