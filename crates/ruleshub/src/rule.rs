//! The rule record and its metadata/content views.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::source::ContentSource;

/// Normalize a rule id: lower-case, spaces replaced by hyphens.
///
/// Idempotent: normalizing an already-normalized id returns it unchanged.
pub fn normalize_id(id: &str) -> String {
    id.to_lowercase().replace(' ', "-")
}

/// One unit of retrievable knowledge.
///
/// Holds metadata only; the full text is produced on demand by the attached
/// [`ContentSource`].
#[derive(Clone)]
pub struct Rule {
    pub id: String,
    pub description: String,
    /// Free-text tag; empty means the rule applies generally.
    pub language: String,
    pub tags: Vec<String>,
    pub source: Arc<dyn ContentSource>,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            language: String::new(),
            tags: Vec::new(),
            source,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Metadata view without the content.
    pub fn metadata(&self) -> RuleMetadata {
        RuleMetadata {
            id: self.id.clone(),
            description: self.description.clone(),
            language: self.language.clone(),
            tags: self.tags.clone(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("language", &self.language)
            .field("tags", &self.tags)
            .field("source", &self.source.source_type())
            .finish()
    }
}

/// Browsable metadata of a rule. Never carries the content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    #[serde(rename = "ruleId")]
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Full rule including the content produced by its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContent {
    #[serde(flatten)]
    pub metadata: RuleMetadata,
    pub content: String,
}
