//! In-memory, concurrency-safe store of rules keyed by id.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{Result, RuleError};
use crate::rule::Rule;

/// Process-lifetime rule store.
///
/// Readers share the lock; writers are exclusive. Upserting an existing id
/// replaces the previous rule (last write wins).
#[derive(Default)]
pub struct RuleRepository {
    rules: RwLock<HashMap<String, Rule>>,
}

impl RuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a single rule.
    pub async fn upsert(&self, rule: Rule) -> Result<()> {
        if rule.id.is_empty() {
            return Err(RuleError::Validation("rule ID is required".to_string()));
        }
        self.rules.write().await.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Insert or replace many rules under one write lock.
    ///
    /// Rules with an empty id are skipped with a warning. Returns the number
    /// of rules stored.
    pub async fn upsert_all(&self, rules: impl IntoIterator<Item = Rule>) -> usize {
        let mut map = self.rules.write().await;
        let mut stored = 0;
        for rule in rules {
            if rule.id.is_empty() {
                warn!(description = %rule.description, "skipping rule with empty id");
                continue;
            }
            map.insert(rule.id.clone(), rule);
            stored += 1;
        }
        stored
    }

    /// Look up a rule by its exact id. `None` is the normal not-found outcome.
    pub async fn get_by_id(&self, id: &str) -> Option<Rule> {
        self.rules.read().await.get(id).cloned()
    }

    /// Snapshot of every stored rule, in no particular order.
    pub async fn get_all(&self) -> Vec<Rule> {
        self.rules.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}
