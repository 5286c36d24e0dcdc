use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{MembershipOutcome, TerminologyResult, TerminologyService};

/// Configuration for the terminology result cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminologyCacheConfig {
    /// Time-to-live for cached membership outcomes, milliseconds on the wire
    #[serde(with = "crate::utils::duration_millis")]
    pub ttl: Duration,
    /// Maximum number of entries in the cache
    pub max_size: u64,
}

impl Default for TerminologyCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600), // 1 hour
            max_size: 10_000,
        }
    }
}

impl TerminologyCacheConfig {
    pub fn new(ttl: Duration, max_size: u64) -> Self {
        Self { ttl, max_size }
    }

    /// Short-lived caches (5 minutes), for services whose data is refreshed during a run
    pub fn short_lived() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    value_set_url: String,
    code: String,
    system: Option<String>,
}

/// A cached wrapper around a [`TerminologyService`].
///
/// Bulk exports repeat the same handful of codes thousands of times, so
/// outcomes are cached per `(value set, code, system)`. Service faults are
/// never cached; the next call goes back to the inner service.
pub struct CachedTerminologyService {
    inner: Arc<dyn TerminologyService>,
    cache: Cache<CacheKey, MembershipOutcome>,
}

impl CachedTerminologyService {
    pub fn new(inner: Arc<dyn TerminologyService>, config: TerminologyCacheConfig) -> Self {
        let cache = Cache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_size)
            .build();

        Self { inner, cache }
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.cache.entry_count(),
            weighted_size: self.cache.weighted_size(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }
}

impl std::fmt::Debug for CachedTerminologyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTerminologyService")
            .field("entry_count", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

/// Statistics about the cache
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entry_count: u64,
    pub weighted_size: u64,
}

#[async_trait]
impl TerminologyService for CachedTerminologyService {
    async fn check_membership(
        &self,
        code: &str,
        system: Option<&str>,
        value_set_url: &str,
    ) -> TerminologyResult<MembershipOutcome> {
        let key = CacheKey {
            value_set_url: value_set_url.to_string(),
            code: code.to_string(),
            system: system.map(|s| s.to_string()),
        };

        if let Some(outcome) = self.cache.get(&key).await {
            return Ok(outcome);
        }

        let outcome = self
            .inner
            .check_membership(code, system, value_set_url)
            .await?;

        self.cache.insert(key, outcome.clone()).await;

        Ok(outcome)
    }
}
