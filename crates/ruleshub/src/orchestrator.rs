//! Fans a load pass out across every configured source.
//!
//! Each source is matched to the first registered loader that accepts its
//! type tag. A source with no matching loader, or whose loader fails, is
//! logged and skipped so the remaining sources still load.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::SourceProvider;
use crate::error::{Result, RuleError};
use crate::loader::{DirectoryLoader, RuleLoader};
use crate::rule::Rule;

/// Ordered set of loaders, each with a distinct type tag.
#[derive(Default, Clone)]
pub struct LoaderRegistry {
    loaders: Vec<Arc<dyn RuleLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in [`DirectoryLoader`].
    pub fn with_defaults() -> Self {
        Self {
            loaders: vec![Arc::new(DirectoryLoader::default())],
        }
    }

    /// Register a loader. Returns error if its type tag is already taken.
    pub fn register(&mut self, loader: Arc<dyn RuleLoader>) -> Result<()> {
        let tag = loader.loader_type();
        if self
            .loaders
            .iter()
            .any(|l| l.loader_type().eq_ignore_ascii_case(tag))
        {
            return Err(RuleError::DuplicateLoader(tag.to_string()));
        }
        self.loaders.push(loader);
        Ok(())
    }

    /// First registered loader that accepts `loader_type`.
    pub fn find(&self, loader_type: &str) -> Option<Arc<dyn RuleLoader>> {
        self.loaders
            .iter()
            .find(|l| l.can_handle(loader_type))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

/// Aggregate result of one load pass across all sources.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub rules: Vec<Rule>,
    /// Number of configured sources.
    pub sources: usize,
    /// Sources skipped for lack of a loader or because their loader failed.
    pub failed_sources: usize,
    /// Set when cancellation stopped the pass early.
    pub cancelled: bool,
}

/// Discovers sources and drives the matching loaders.
pub struct Orchestrator {
    loaders: LoaderRegistry,
    provider: Arc<dyn SourceProvider>,
}

impl Orchestrator {
    pub fn new(loaders: LoaderRegistry, provider: Arc<dyn SourceProvider>) -> Self {
        Self { loaders, provider }
    }

    /// Load rules from every configured source.
    ///
    /// Fails with [`RuleError::NoSourcesConfigured`] when discovery yields
    /// nothing, and with [`RuleError::AllSourcesFailed`] when no source
    /// loads successfully. A cancelled pass returns what was collected with
    /// [`LoadSummary::cancelled`] set.
    pub async fn load_all(&self, cancel: &CancellationToken) -> Result<LoadSummary> {
        if cancel.is_cancelled() {
            return Err(RuleError::Cancelled);
        }

        let sources = self.provider.sources().await?;
        if sources.is_empty() {
            return Err(RuleError::NoSourcesConfigured);
        }

        let mut summary = LoadSummary {
            sources: sources.len(),
            ..LoadSummary::default()
        };

        for (index, source) in sources.iter().enumerate() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let Some(loader) = self.loaders.find(&source.loader_type) else {
                warn!(index, loader_type = %source.loader_type, "no loader found for source type, skipping");
                summary.failed_sources += 1;
                continue;
            };

            match loader.load(source, cancel).await {
                Ok(load) => {
                    summary.rules.extend(load.rules);
                    if load.cancelled {
                        summary.cancelled = true;
                        break;
                    }
                }
                Err(RuleError::Cancelled) => {
                    summary.cancelled = true;
                    break;
                }
                Err(e) => {
                    warn!(index, loader_type = %source.loader_type, error = %e, "failed to load rules from source");
                    summary.failed_sources += 1;
                }
            }
        }

        if !summary.cancelled && summary.failed_sources == summary.sources {
            return Err(RuleError::AllSourcesFailed(summary.sources));
        }

        info!(
            sources = summary.sources,
            failed_sources = summary.failed_sources,
            rules = summary.rules.len(),
            cancelled = summary.cancelled,
            "rule load pass finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::config::{SourceConfig, StaticSourceProvider};
    use crate::loader::SourceLoad;

    fn yaml_source(dir: &Path) -> SourceConfig {
        SourceConfig::new("YamlFile").with_setting("Path", dir.display().to_string())
    }

    fn dir_with_rules(ids: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for id in ids {
            fs::write(
                dir.path().join(format!("{id}.yaml")),
                format!("id: {id}\ndescription: d\nrule: r\n"),
            )
            .unwrap();
        }
        dir
    }

    fn orchestrator(sources: Vec<SourceConfig>) -> Orchestrator {
        Orchestrator::new(
            LoaderRegistry::with_defaults(),
            Arc::new(StaticSourceProvider::new(sources)),
        )
    }

    fn sorted_ids(summary: &LoadSummary) -> Vec<String> {
        let mut ids: Vec<_> = summary.rules.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn no_sources_is_fatal() {
        let err = orchestrator(vec![])
            .load_all(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RuleError::NoSourcesConfigured));
    }

    #[tokio::test]
    async fn one_bad_source_does_not_block_others() {
        let first = dir_with_rules(&["a", "b"]);
        let second = dir_with_rules(&["c"]);
        let missing = first.path().join("does-not-exist");

        let summary = orchestrator(vec![
            yaml_source(first.path()),
            yaml_source(&missing),
            yaml_source(second.path()),
        ])
        .load_all(&CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(sorted_ids(&summary), vec!["a", "b", "c"]);
        assert_eq!(summary.sources, 3);
        assert_eq!(summary.failed_sources, 1);
    }

    #[tokio::test]
    async fn unknown_loader_type_is_skipped() {
        let dir = dir_with_rules(&["a"]);
        let summary = orchestrator(vec![
            SourceConfig::new("Http").with_setting("Url", "http://example.invalid"),
            yaml_source(dir.path()),
        ])
        .load_all(&CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(sorted_ids(&summary), vec!["a"]);
        assert_eq!(summary.failed_sources, 1);
    }

    #[tokio::test]
    async fn every_source_failing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = orchestrator(vec![
            yaml_source(&dir.path().join("x")),
            SourceConfig::new("Unknown"),
        ])
        .load_all(&CancellationToken::new())
        .await
        .unwrap_err();
        assert!(matches!(err, RuleError::AllSourcesFailed(2)));
    }

    #[tokio::test]
    async fn empty_directory_counts_as_success() {
        let dir = TempDir::new().unwrap();
        let summary = orchestrator(vec![yaml_source(dir.path())])
            .load_all(&CancellationToken::new())
            .await
            .unwrap();
        assert!(summary.rules.is_empty());
        assert_eq!(summary.failed_sources, 0);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let err = orchestrator(vec![SourceConfig::new("YamlFile")])
            .load_all(&token)
            .await
            .unwrap_err();
        assert!(matches!(err, RuleError::Cancelled));
    }

    /// Loader that accepts any tag and counts invocations.
    struct CatchAll {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RuleLoader for CatchAll {
        fn loader_type(&self) -> &str {
            "CatchAll"
        }

        fn can_handle(&self, _loader_type: &str) -> bool {
            true
        }

        async fn load(&self, _config: &SourceConfig, _cancel: &CancellationToken) -> Result<SourceLoad> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SourceLoad::default())
        }
    }

    #[tokio::test]
    async fn first_matching_loader_wins() {
        let catch_all = Arc::new(CatchAll {
            calls: AtomicUsize::new(0),
        });
        let mut registry = LoaderRegistry::new();
        registry.register(catch_all.clone()).unwrap();
        registry.register(Arc::new(DirectoryLoader::default())).unwrap();

        let dir = dir_with_rules(&["a"]);
        let summary = Orchestrator::new(
            registry,
            Arc::new(StaticSourceProvider::new(vec![yaml_source(dir.path())])),
        )
        .load_all(&CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(catch_all.calls.load(Ordering::SeqCst), 1);
        assert!(summary.rules.is_empty());
    }

    /// Directory loader that cancels the pass once its first call returns.
    struct CancelAfterFirst {
        inner: DirectoryLoader,
        token: CancellationToken,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RuleLoader for CancelAfterFirst {
        fn loader_type(&self) -> &str {
            self.inner.loader_type()
        }

        async fn load(&self, config: &SourceConfig, cancel: &CancellationToken) -> Result<SourceLoad> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let load = self.inner.load(config, cancel).await;
            self.token.cancel();
            load
        }
    }

    fn cancelling_orchestrator(
        token: &CancellationToken,
        sources: Vec<SourceConfig>,
    ) -> (Orchestrator, Arc<CancelAfterFirst>) {
        let loader = Arc::new(CancelAfterFirst {
            inner: DirectoryLoader::default(),
            token: token.clone(),
            calls: AtomicUsize::new(0),
        });
        let mut registry = LoaderRegistry::new();
        registry.register(loader.clone()).unwrap();
        let orchestrator =
            Orchestrator::new(registry, Arc::new(StaticSourceProvider::new(sources)));
        (orchestrator, loader)
    }

    #[tokio::test]
    async fn cancelled_between_sources_keeps_partial_rules() {
        let first = dir_with_rules(&["a", "b"]);
        let second = dir_with_rules(&["c"]);
        let token = CancellationToken::new();
        let (orchestrator, loader) = cancelling_orchestrator(
            &token,
            vec![yaml_source(first.path()), yaml_source(second.path())],
        );

        let summary = orchestrator.load_all(&token).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(sorted_ids(&summary), vec!["a", "b"]);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_pass_without_successes_is_not_all_failed() {
        let second = dir_with_rules(&["c"]);
        let token = CancellationToken::new();
        let (orchestrator, loader) = cancelling_orchestrator(
            &token,
            vec![
                yaml_source(&second.path().join("missing")),
                yaml_source(second.path()),
            ],
        );

        let summary = orchestrator.load_all(&token).await.unwrap();
        assert!(summary.cancelled);
        assert!(summary.rules.is_empty());
        assert_eq!(summary.failed_sources, 1);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn duplicate_loader_type_rejected() {
        let mut registry = LoaderRegistry::with_defaults();
        let err = registry
            .register(Arc::new(DirectoryLoader::default()))
            .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateLoader(_)));
        assert_eq!(registry.len(), 1);
    }
}
