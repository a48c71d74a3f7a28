//! Diagnostics a loader hands back alongside the rules it produced.

use std::path::PathBuf;

use crate::rule::Rule;

/// What became of one path the directory walk visited.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Stored under this normalized id.
    Loaded { rule_id: String },
    /// Never handed to the parser: hidden entry or wrong extension.
    Skipped { reason: String },
    /// Handed to the parser (or the walk) and rejected; the message is the
    /// rendered [`RuleError`](crate::RuleError).
    Failed { error: String },
}

/// Everything one loader call produced for one source.
#[derive(Debug, Default)]
pub struct SourceLoad {
    pub rules: Vec<Rule>,
    pub results: Vec<LoadResult>,
    /// Set when cancellation stopped the scan early; `rules` holds what was
    /// collected before that point.
    pub cancelled: bool,
}

impl SourceLoad {
    pub fn failed(&self) -> impl Iterator<Item = &LoadResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &LoadResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
    }
}
