//! Error taxonomy for loading and serving rules.

use std::path::PathBuf;

/// Errors that can occur while loading, storing or serving rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A file or directory could not be read.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document was read but carries no usable content payload.
    #[error("Content error: {0}")]
    Content(String),

    /// A rule document is missing a mandatory field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad or missing settings for one configured source.
    #[error("Config error: {0}")]
    Config(String),

    /// A content source has no backing location.
    #[error("content source is not configured")]
    NotConfigured,

    /// Discovery produced an empty source list.
    #[error("no rule sources configured")]
    NoSourcesConfigured,

    /// Every configured source failed to load.
    #[error("all {0} configured rule sources failed to load")]
    AllSourcesFailed(usize),

    /// No rule with the requested id.
    #[error("rule not found: {0}")]
    NotFound(String),

    /// A loader with the same type tag is already registered.
    #[error("loader with type '{0}' is already registered")]
    DuplicateLoader(String),

    /// The operation context was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl RuleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RuleError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
