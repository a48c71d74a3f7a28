//! Parses one rule document into a validated [`Rule`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, RuleError};
use crate::rule::{normalize_id, Rule};
use crate::source::FileSource;

/// Converts one raw unit into a validated rule.
#[async_trait]
pub trait RuleParser: Send + Sync {
    async fn parse(&self, path: &Path, cancel: &CancellationToken) -> Result<Rule>;
}

/// On-disk shape of a YAML rule file. Unknown fields are ignored.
///
/// Scalars are optional so that YAML `null` / `~` reads as absent rather than
/// as the literal text `"null"`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RuleFile {
    pub id: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub tags: Option<Vec<String>>,
    pub rule: Option<String>,
}

fn is_blank(field: Option<&str>) -> bool {
    field.unwrap_or_default().is_empty()
}

impl RuleFile {
    /// Check the mandatory fields: `id`, `description` and `rule`.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let missing = if is_blank(self.id.as_deref()) {
            "id"
        } else if is_blank(self.description.as_deref()) {
            "description"
        } else if is_blank(self.rule.as_deref()) {
            "rule"
        } else {
            return Ok(());
        };
        Err(RuleError::Validation(format!(
            "rule {} is required in file: {}",
            missing,
            path.display()
        )))
    }
}

/// Parser for YAML rule files. Attaches a [`FileSource`] bound to the same path.
#[derive(Debug, Default, Clone)]
pub struct YamlRuleParser;

impl YamlRuleParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse already-read file contents.
    pub fn parse_str(&self, contents: &str, path: &Path) -> Result<Rule> {
        let file: RuleFile = serde_yaml::from_str(contents)?;
        file.validate(path)?;

        Ok(Rule::new(
            normalize_id(file.id.as_deref().unwrap_or_default()),
            file.description.unwrap_or_default(),
            Arc::new(FileSource::new(path)),
        )
        .with_language(file.language.unwrap_or_default())
        .with_tags(file.tags.unwrap_or_default()))
    }
}

#[async_trait]
impl RuleParser for YamlRuleParser {
    async fn parse(&self, path: &Path, cancel: &CancellationToken) -> Result<Rule> {
        if cancel.is_cancelled() {
            return Err(RuleError::Cancelled);
        }
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RuleError::io(path, e))?;
        self.parse_str(&contents, path)
    }
}
