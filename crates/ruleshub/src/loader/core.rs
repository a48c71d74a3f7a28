//! [`RuleLoader`] trait and the filesystem-backed [`DirectoryLoader`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::SourceConfig;
use crate::error::{Result, RuleError};
use crate::parser::{RuleParser, YamlRuleParser};

use super::report::{LoadResult, LoadStatus, SourceLoad};

/// Type tag handled by [`DirectoryLoader`].
pub const YAML_FILE_LOADER: &str = "YamlFile";

/// File extensions treated as rule documents.
pub const RULE_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Loads rules from one kind of source.
#[async_trait]
pub trait RuleLoader: Send + Sync {
    /// Type tag this loader declares (e.g. `"YamlFile"`).
    fn loader_type(&self) -> &str;

    /// Whether this loader accepts a configured type tag. Case-insensitive.
    fn can_handle(&self, loader_type: &str) -> bool {
        loader_type.eq_ignore_ascii_case(self.loader_type())
    }

    /// Enumerate and parse every raw unit of the configured source.
    ///
    /// Fails only for source-level problems (bad settings, missing
    /// directory). Per-file failures end up in [`SourceLoad::results`].
    async fn load(&self, config: &SourceConfig, cancel: &CancellationToken) -> Result<SourceLoad>;
}

/// Loads `*.yaml` / `*.yml` rule files from a directory.
///
/// Settings:
/// - `Path` (required): directory to scan.
/// - `Recursive` (optional, default `false`): descend into subdirectories.
///
/// Dotfiles and dot-directories are skipped. Files are visited in file-name
/// order.
pub struct DirectoryLoader {
    parser: Arc<dyn RuleParser>,
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self::new(Arc::new(YamlRuleParser::new()))
    }
}

impl DirectoryLoader {
    pub fn new(parser: Arc<dyn RuleParser>) -> Self {
        Self { parser }
    }

    async fn resolve_dir(config: &SourceConfig) -> Result<PathBuf> {
        let dir = config
            .setting_str("Path")
            .map(PathBuf::from)
            .ok_or_else(|| RuleError::Config("path setting is required".to_string()))?;

        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(RuleError::Config(format!(
                "path is not a directory: {}",
                dir.display()
            ))),
            Err(_) => Err(RuleError::Config(format!(
                "directory not found: {}",
                dir.display()
            ))),
        }
    }
}

#[async_trait]
impl RuleLoader for DirectoryLoader {
    fn loader_type(&self) -> &str {
        YAML_FILE_LOADER
    }

    async fn load(&self, config: &SourceConfig, cancel: &CancellationToken) -> Result<SourceLoad> {
        if cancel.is_cancelled() {
            return Err(RuleError::Cancelled);
        }

        let dir = Self::resolve_dir(config).await?;
        let recursive = config.setting_bool("Recursive").unwrap_or(false);

        let scan_dir = dir.clone();
        let (candidates, mut results) =
            tokio::task::spawn_blocking(move || scan_candidates(&scan_dir, recursive))
                .await
                .map_err(|e| RuleError::io(&dir, std::io::Error::other(e)))??;

        let mut load = SourceLoad::default();
        for path in candidates {
            if cancel.is_cancelled() {
                load.cancelled = true;
                break;
            }

            match self.parser.parse(&path, cancel).await {
                Ok(rule) => {
                    debug!(rule_id = %rule.id, path = %path.display(), "parsed rule");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded {
                            rule_id: rule.id.clone(),
                        },
                    });
                    load.rules.push(rule);
                }
                Err(RuleError::Cancelled) => {
                    load.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }
        load.results = results;

        info!(
            path = %dir.display(),
            loaded = load.rules.len(),
            failed = load.failed().count(),
            cancelled = load.cancelled,
            "scanned rule directory"
        );
        Ok(load)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn is_rule_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RULE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Walk `dir` and split files into rule candidates and skip reports.
///
/// An unreadable `dir` fails the whole source; unreadable entries below it
/// are reported per path.
pub(super) fn scan_candidates(
    dir: &Path,
    recursive: bool,
) -> Result<(Vec<PathBuf>, Vec<LoadResult>)> {
    let mut walker = WalkDir::new(dir).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut candidates = Vec::new();
    let mut results = Vec::new();

    let mut entries = walker.into_iter();
    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("unreadable rule directory"));
                return Err(RuleError::io(dir, source));
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                warn!(path = %path.display(), error = %e, "failed to read directory entry");
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Failed {
                        error: e.to_string(),
                    },
                });
                continue;
            }
        };

        if is_hidden(&entry) {
            if entry.file_type().is_dir() {
                entries.skip_current_dir();
            } else {
                results.push(LoadResult {
                    path: entry.into_path(),
                    status: LoadStatus::Skipped {
                        reason: "dotfile".to_string(),
                    },
                });
            }
            continue;
        }

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.into_path();
        if is_rule_file(&path) {
            candidates.push(path);
        } else {
            results.push(LoadResult {
                path,
                status: LoadStatus::Skipped {
                    reason: "not a YAML file".to_string(),
                },
            });
        }
    }

    Ok((candidates, results))
}
