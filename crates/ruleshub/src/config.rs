//! Source configuration and discovery.
//!
//! A [`SourceConfig`] names a loader type and carries free-form settings that
//! only the matching loader interprets. Discovery goes through the
//! [`SourceProvider`] trait so the orchestrator never reads the process
//! environment directly.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, RuleError};

/// Default env prefix for indexed source definitions.
pub const DEFAULT_ENV_PREFIX: &str = "RULESHUB_SOURCES_";

/// Single-directory fallback variable.
pub const RULE_DIRECTORY_VAR: &str = "RULE_DIRECTORY";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// One configured origin of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(rename = "loaderType")]
    pub loader_type: String,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl SourceConfig {
    pub fn new(loader_type: impl Into<String>) -> Self {
        Self {
            loader_type: loader_type.into(),
            settings: BTreeMap::new(),
        }
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Look up a setting. Exact key first, then ASCII case-insensitive, so
    /// `PATH` from the environment satisfies a lookup for `Path`.
    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key).or_else(|| {
            self.settings
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// A non-empty string setting.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.setting(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// A boolean setting; accepts JSON booleans and `"true"`/`"false"` strings.
    pub fn setting_bool(&self, key: &str) -> Option<bool> {
        match self.setting(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Supplies the ordered list of configured sources for one load pass.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn sources(&self) -> Result<Vec<SourceConfig>>;
}

/// A fixed list of sources.
#[derive(Debug, Clone, Default)]
pub struct StaticSourceProvider {
    sources: Vec<SourceConfig>,
}

impl StaticSourceProvider {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl SourceProvider for StaticSourceProvider {
    async fn sources(&self) -> Result<Vec<SourceConfig>> {
        Ok(self.sources.clone())
    }
}

/// Discovers sources from environment variables.
///
/// `{PREFIX}{index}_LOADERTYPE=<tag>` declares a source and
/// `{PREFIX}{index}_SETTINGS_{key}=<value>` adds settings to it. Indices may
/// be sparse; sources are returned in ascending index order. When no indexed
/// source exists, a non-empty `RULE_DIRECTORY` yields a single `YamlFile`
/// source for that directory.
#[derive(Debug, Clone)]
pub struct EnvSourceProvider {
    prefix: String,
}

impl Default for EnvSourceProvider {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl EnvSourceProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Discover from an explicit set of variables instead of the process env.
    pub fn discover<I>(&self, vars: I) -> Result<Vec<SourceConfig>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut indexed: BTreeMap<usize, (Option<String>, BTreeMap<String, Value>)> =
            BTreeMap::new();
        let mut rule_directory = None;

        for (key, value) in vars {
            if key == RULE_DIRECTORY_VAR {
                rule_directory = Some(value);
                continue;
            }
            let Some(rest) = key.strip_prefix(&self.prefix) else {
                continue;
            };
            let Some((index, field)) = rest.split_once('_') else {
                continue;
            };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };

            let entry = indexed.entry(index).or_default();
            if field == "LOADERTYPE" {
                entry.0 = Some(value);
            } else if let Some(setting) = field.strip_prefix("SETTINGS_") {
                if !setting.is_empty() {
                    entry.1.insert(setting.to_string(), Value::String(value));
                }
            }
        }

        if indexed.is_empty() {
            return Ok(rule_directory
                .filter(|dir| !dir.is_empty())
                .map(|dir| {
                    vec![SourceConfig::new("YamlFile")
                        .with_setting("Path", absolutize(Path::new(&dir)).display().to_string())]
                })
                .unwrap_or_default());
        }

        indexed
            .into_iter()
            .map(|(index, (loader_type, settings))| match loader_type {
                Some(loader_type) if !loader_type.is_empty() => Ok(SourceConfig {
                    loader_type,
                    settings,
                }),
                _ => Err(RuleError::Config(format!(
                    "loader type not specified for source {}",
                    index
                ))),
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for EnvSourceProvider {
    async fn sources(&self) -> Result<Vec<SourceConfig>> {
        // Non-UTF-8 variables cannot name a source; skip them.
        self.discover(
            env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// On-disk shape of a sources file.
#[derive(Debug, Default, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    sources: Vec<SourceConfig>,
}

/// Reads sources from a YAML (or JSON) document of the form
/// `{ sources: [{ loaderType, settings }] }`. Re-read on every load pass.
#[derive(Debug, Clone)]
pub struct FileSourceProvider {
    path: PathBuf,
}

impl FileSourceProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SourceProvider for FileSourceProvider {
    async fn sources(&self) -> Result<Vec<SourceConfig>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| RuleError::io(&self.path, e))?;
        let file: SourcesFile = serde_yaml::from_str(&contents)?;
        Ok(file.sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn groups_by_sparse_index_in_order() {
        let provider = EnvSourceProvider::default();
        let sources = provider
            .discover(vars(&[
                ("RULESHUB_SOURCES_7_SETTINGS_PATH", "/b"),
                ("RULESHUB_SOURCES_2_LOADERTYPE", "YamlFile"),
                ("RULESHUB_SOURCES_7_LOADERTYPE", "yamlfile"),
                ("RULESHUB_SOURCES_2_SETTINGS_PATH", "/a"),
                ("RULESHUB_SOURCES_2_SETTINGS_RECURSIVE", "true"),
                ("HOME", "/root"),
                ("RULESHUB_SOURCES_X_LOADERTYPE", "ignored"),
            ]))
            .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].loader_type, "YamlFile");
        assert_eq!(sources[0].setting_str("Path"), Some("/a"));
        assert_eq!(sources[0].setting_bool("Recursive"), Some(true));
        assert_eq!(sources[1].loader_type, "yamlfile");
        assert_eq!(sources[1].setting_str("Path"), Some("/b"));
    }

    #[test]
    fn missing_loader_type_fails_discovery() {
        let err = EnvSourceProvider::default()
            .discover(vars(&[
                ("RULESHUB_SOURCES_0_LOADERTYPE", "YamlFile"),
                ("RULESHUB_SOURCES_0_SETTINGS_PATH", "/a"),
                ("RULESHUB_SOURCES_1_SETTINGS_PATH", "/b"),
            ]))
            .unwrap_err();
        match err {
            RuleError::Config(msg) => assert!(msg.contains("source 1")),
            other => panic!("expected config error, got {other}"),
        }
    }

    #[test]
    fn empty_env_yields_no_sources() {
        let sources = EnvSourceProvider::default()
            .discover(vars(&[("PATH", "/usr/bin")]))
            .unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn rule_directory_fallback() {
        let sources = EnvSourceProvider::default()
            .discover(vars(&[("RULE_DIRECTORY", "/srv/rules")]))
            .unwrap();
        assert_eq!(sources, vec![SourceConfig::new("YamlFile").with_setting("Path", "/srv/rules")]);

        let relative = EnvSourceProvider::default()
            .discover(vars(&[("RULE_DIRECTORY", "rules")]))
            .unwrap();
        let path = PathBuf::from(relative[0].setting_str("Path").unwrap());
        assert!(path.is_absolute());
        assert!(path.ends_with("rules"));
    }

    #[test]
    fn indexed_sources_take_precedence_over_rule_directory() {
        let sources = EnvSourceProvider::default()
            .discover(vars(&[
                ("RULE_DIRECTORY", "/srv/rules"),
                ("RULESHUB_SOURCES_0_LOADERTYPE", "YamlFile"),
                ("RULESHUB_SOURCES_0_SETTINGS_PATH", "/a"),
            ]))
            .unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].setting_str("Path"), Some("/a"));
    }

    #[test]
    fn custom_prefix() {
        let sources = EnvSourceProvider::new("HUB_")
            .discover(vars(&[
                ("HUB_0_LOADERTYPE", "YamlFile"),
                ("RULESHUB_SOURCES_0_LOADERTYPE", "Other"),
            ]))
            .unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].loader_type, "YamlFile");
    }

    #[test]
    fn setting_accessors() {
        let config = SourceConfig::new("YamlFile")
            .with_setting("Path", "")
            .with_setting("Recursive", true)
            .with_setting("Depth", 3);
        assert_eq!(config.setting_str("Path"), None);
        assert_eq!(config.setting_bool("recursive"), Some(true));
        assert_eq!(config.setting_bool("Depth"), None);
        assert!(config.setting("missing").is_none());
    }

    #[tokio::test]
    async fn file_provider_reads_sources() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sources.yaml");
        std::fs::write(
            &path,
            "sources:\n  - loaderType: YamlFile\n    settings:\n      Path: /a\n      Recursive: true\n",
        )
        .unwrap();

        let sources = FileSourceProvider::new(&path).sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].setting_str("Path"), Some("/a"));
        assert_eq!(sources[0].setting_bool("Recursive"), Some(true));
    }
}
