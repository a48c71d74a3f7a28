//! Lazily initializing front door for rule queries.
//!
//! The first query triggers one orchestrator pass under a dedicated mutex,
//! separate from the repository's lock. A failed pass leaves the hub
//! uninitialized and the next query retries.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{EnvSourceProvider, SourceProvider};
use crate::error::{Result, RuleError};
use crate::orchestrator::{LoaderRegistry, Orchestrator};
use crate::repository::RuleRepository;
use crate::rule::{normalize_id, RuleContent, RuleMetadata};

pub struct RulesHub {
    orchestrator: Orchestrator,
    repository: RuleRepository,
    initialized: Mutex<bool>,
}

impl RulesHub {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            repository: RuleRepository::new(),
            initialized: Mutex::new(false),
        }
    }

    /// Built-in loaders with the given source provider.
    pub fn with_provider(provider: Arc<dyn SourceProvider>) -> Self {
        Self::new(Orchestrator::new(LoaderRegistry::with_defaults(), provider))
    }

    /// Built-in loaders with sources discovered from the process environment.
    pub fn from_env() -> Self {
        Self::with_provider(Arc::new(EnvSourceProvider::default()))
    }

    pub fn repository(&self) -> &RuleRepository {
        &self.repository
    }

    /// Whether a load pass has completed. `false` while one is in flight.
    pub fn is_ready(&self) -> bool {
        self.initialized
            .try_lock()
            .map(|ready| *ready)
            .unwrap_or(false)
    }

    async fn ensure_initialized(&self, cancel: &CancellationToken) -> Result<()> {
        // Waiters queue behind an in-flight pass but leave on cancellation.
        let mut ready = tokio::select! {
            guard = self.initialized.lock() => guard,
            _ = cancel.cancelled() => return Err(RuleError::Cancelled),
        };
        if *ready {
            return Ok(());
        }

        let summary = self.orchestrator.load_all(cancel).await?;
        if summary.cancelled {
            return Err(RuleError::Cancelled);
        }

        let stored = self.repository.upsert_all(summary.rules).await;
        *ready = true;
        info!(
            rules = stored,
            sources = summary.sources,
            failed_sources = summary.failed_sources,
            "rules hub initialized"
        );
        Ok(())
    }

    /// Metadata of every rule, sorted by id. Never includes content.
    pub async fn get_all_metadata(&self, cancel: &CancellationToken) -> Result<Vec<RuleMetadata>> {
        self.ensure_initialized(cancel).await?;

        let mut metadata: Vec<_> = self
            .repository
            .get_all()
            .await
            .iter()
            .map(|rule| rule.metadata())
            .collect();
        metadata.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(metadata)
    }

    /// Full rule including content freshly produced by its source.
    ///
    /// The query id is normalized the same way stored ids are, so
    /// `"Go Formatting"` finds `go-formatting`.
    pub async fn get_content_by_id(&self, id: &str, cancel: &CancellationToken) -> Result<RuleContent> {
        self.ensure_initialized(cancel).await?;

        let id = normalize_id(id);
        let rule = self
            .repository
            .get_by_id(&id)
            .await
            .ok_or_else(|| RuleError::NotFound(id.clone()))?;
        let content = rule.source.content(cancel).await?;

        Ok(RuleContent {
            metadata: rule.metadata(),
            content,
        })
    }
}
