//! TTL cache for prompts.
//!
//! Expiry never evicts: an expired entry stays servable (stale) until a
//! background refresh replaces it or a write invalidates it. The refresh
//! guard map gives single-flight semantics per key.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::types::Prompt;

/// Cache identity: name, version, and label are independent axes, so
/// `("greeting", None, None)` and `("greeting", None, Some("production"))`
/// are distinct entries.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct PromptKey {
    pub name: String,
    pub version: Option<u32>,
    pub label: Option<String>,
}

struct CacheEntry {
    value: Arc<Prompt>,
    expires_at: Instant,
}

#[derive(Default)]
pub struct PromptCache {
    entries: DashMap<PromptKey, CacheEntry>,
    refreshing: DashMap<PromptKey, ()>,
}

impl PromptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value and whether it is still fresh.
    pub fn lookup(&self, key: &PromptKey) -> Option<(Arc<Prompt>, bool)> {
        let entry = self.entries.get(key)?;
        let fresh = entry.expires_at > Instant::now();
        Some((entry.value.clone(), fresh))
    }

    pub fn insert(&self, key: PromptKey, value: Arc<Prompt>, ttl: Duration) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drops every entry for a prompt name, across all version/label
    /// variants. Called after writes so the next `get` re-fetches.
    pub fn invalidate_name(&self, name: &str) {
        self.entries.retain(|key, _| key.name != name);
    }

    /// Claims the refresh slot for a key. Returns false when another
    /// refresh for the same key is already in flight.
    pub fn begin_refresh(&self, key: &PromptKey) -> bool {
        self.refreshing.insert(key.clone(), ()).is_none()
    }

    pub fn end_refresh(&self, key: &PromptKey) {
        self.refreshing.remove(key);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
