//! Session cache: refresh-token liveness with TTL expiry.
//!
//! The cache is the only shared mutable state of the service. A key is the
//! literal refresh token string, the value a liveness marker whose TTL is
//! the refresh-token lifetime.

mod memory;
mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::configuration::{CacheBackend, Settings};

pub use memory::InMemorySessionCache;
pub use redis_cache::RedisSessionCache;

#[derive(Debug, Error)]
pub enum SessionCacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("ttl {0:?} is out of range")]
    TtlOutOfRange(Duration),
}

/// Result of looking a refresh token up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// Never stored, already consumed, revoked or expired
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Old key removed and new key stored in one step
    Replaced,
    /// Old key was already gone; nothing was written
    OldAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Mark `key` active for `ttl`
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), SessionCacheError>;

    async fn is_active(&self, key: &str) -> Result<SessionStatus, SessionCacheError>;

    /// Delete `old_key` and insert `new_key` atomically
    ///
    /// The insert only happens if the delete removed a live entry, so of
    /// two concurrent rotations of the same key exactly one is applied.
    async fn atomic_replace(
        &self,
        old_key: &str,
        new_key: &str,
        ttl: Duration,
    ) -> Result<ReplaceOutcome, SessionCacheError>;

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, SessionCacheError>;
}

/// Build the cache selected by `cache.backend`
pub async fn build_session_cache(
    settings: &Settings,
) -> Result<Arc<dyn SessionCache>, SessionCacheError> {
    match settings.cache.backend {
        CacheBackend::Redis => {
            let cache = RedisSessionCache::connect(&settings.redis).await?;
            tracing::info!("Session cache backend: redis");
            Ok(Arc::new(cache))
        }
        CacheBackend::Memory => {
            tracing::warn!("Session cache backend: memory (single instance only)");
            Ok(Arc::new(InMemorySessionCache::new()))
        }
    }
}

/// Redis `EX` takes whole seconds and rejects zero
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}
