//! Content sources: per-rule handles that re-produce the full rule text.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RuleError};

/// Key of the content field in a rule document.
pub const CONTENT_FIELD: &str = "rule";

/// Produces a rule's textual content on demand.
///
/// Implementations must not cache: every call goes back to the backing
/// location so external edits are visible without a restart.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short type label (e.g. `"File"`).
    fn source_type(&self) -> &str;

    /// Produce the rule content.
    async fn content(&self, cancel: &CancellationToken) -> Result<String>;
}

/// Content source backed by a single YAML rule file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContentSource for FileSource {
    fn source_type(&self) -> &str {
        "File"
    }

    async fn content(&self, cancel: &CancellationToken) -> Result<String> {
        if self.path.as_os_str().is_empty() {
            return Err(RuleError::NotConfigured);
        }
        if cancel.is_cancelled() {
            return Err(RuleError::Cancelled);
        }

        let data = tokio::select! {
            read = tokio::fs::read_to_string(&self.path) => {
                read.map_err(|e| RuleError::io(&self.path, e))?
            }
            _ = cancel.cancelled() => return Err(RuleError::Cancelled),
        };

        let doc: serde_yaml::Value = serde_yaml::from_str(&data)?;
        doc.get(CONTENT_FIELD)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RuleError::Content(format!(
                    "'{}' field not found or not a string in {}",
                    CONTENT_FIELD,
                    self.path.display()
                ))
            })
    }
}
