//! Cached prompt client: fresh hits are lock-free reads, expired entries
//! are served stale while one background refresh runs, misses fetch
//! synchronously.

use std::sync::Arc;
use std::time::Duration;

use lantern_core::{Error, Result};

use crate::cache::{PromptCache, PromptKey};
use crate::fetcher::PromptFetcher;
use crate::types::{CreatePromptRequest, Prompt, PromptContent};

/// Per-call options for [`PromptClient::get`].
#[derive(Debug, Clone, Default)]
pub struct GetPromptOptions {
    /// Exact version to fetch. Mutually exclusive with `label`.
    pub version: Option<u32>,
    /// Deployment label to fetch (e.g. `production`). Mutually exclusive
    /// with `version`.
    pub label: Option<String>,
    /// Served (marked `is_fallback`) when the prompt cannot be fetched and
    /// nothing usable is cached.
    pub fallback: Option<PromptContent>,
    /// Overrides the client-wide TTL for this call. Zero disables caching
    /// for the call entirely.
    pub cache_ttl: Option<Duration>,
}

pub struct PromptClient {
    fetcher: Arc<dyn PromptFetcher>,
    cache: Arc<PromptCache>,
    default_ttl: Duration,
}

impl PromptClient {
    pub fn new(fetcher: Arc<dyn PromptFetcher>, default_ttl: Duration) -> Self {
        Self {
            fetcher,
            cache: Arc::new(PromptCache::new()),
            default_ttl,
        }
    }

    /// Gets a prompt by name, optionally pinned to a version or label.
    ///
    /// Cache behavior: a fresh entry is returned without any network call;
    /// an expired entry is returned immediately while one background
    /// refresh updates it; a miss fetches synchronously. Fetch errors only
    /// surface on a miss with no fallback.
    pub async fn get(&self, name: &str, opts: GetPromptOptions) -> Result<Arc<Prompt>> {
        if opts.version.is_some() && opts.label.is_some() {
            return Err(Error::prompt(
                "cannot request a prompt by both version and label",
            ));
        }

        let ttl = opts.cache_ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            return match self
                .fetcher
                .fetch(name, opts.version, opts.label.as_deref())
                .await
            {
                Ok(prompt) => Ok(Arc::new(prompt)),
                Err(e) => self.fallback_or(e, name, opts.fallback),
            };
        }

        let key = PromptKey {
            name: name.to_string(),
            version: opts.version,
            label: opts.label.clone(),
        };

        if let Some((value, fresh)) = self.cache.lookup(&key) {
            if !fresh {
                self.spawn_refresh(key, ttl);
            }
            return Ok(value);
        }

        match self
            .fetcher
            .fetch(name, opts.version, opts.label.as_deref())
            .await
        {
            Ok(prompt) => {
                let value = Arc::new(prompt);
                self.cache.insert(key, value.clone(), ttl);
                Ok(value)
            }
            Err(e) => self.fallback_or(e, name, opts.fallback),
        }
    }

    /// Creates a new prompt version and invalidates every cached variant of
    /// that name.
    pub async fn create_prompt(&self, request: CreatePromptRequest) -> Result<Prompt> {
        let created = self.fetcher.create(&request).await?;
        self.cache.invalidate_name(&request.name);
        Ok(created)
    }

    /// Moves labels onto a prompt version and invalidates every cached
    /// variant of that name.
    pub async fn update_prompt(
        &self,
        name: &str,
        version: u32,
        labels: Vec<String>,
    ) -> Result<Prompt> {
        let updated = self.fetcher.update_labels(name, version, &labels).await?;
        self.cache.invalidate_name(name);
        Ok(updated)
    }

    fn fallback_or(
        &self,
        error: Error,
        name: &str,
        fallback: Option<PromptContent>,
    ) -> Result<Arc<Prompt>> {
        match fallback {
            Some(content) => {
                tracing::warn!("prompt fetch for '{}' failed, serving fallback: {}", name, error);
                Ok(Arc::new(Prompt::fallback(name, content)))
            }
            None => Err(error),
        }
    }

    fn spawn_refresh(&self, key: PromptKey, ttl: Duration) {
        if !self.cache.begin_refresh(&key) {
            return;
        }
        let fetcher = self.fetcher.clone();
        let cache = self.cache.clone();
        tokio::spawn(async move {
            match fetcher
                .fetch(&key.name, key.version, key.label.as_deref())
                .await
            {
                Ok(prompt) => cache.insert(key.clone(), Arc::new(prompt), ttl),
                Err(e) => tracing::warn!(
                    "background refresh of prompt '{}' failed, keeping stale entry: {}",
                    key.name,
                    e
                ),
            }
            cache.end_refresh(&key);
        });
    }

    #[cfg(test)]
    fn cache(&self) -> &PromptCache {
        &self.cache
    }
}
