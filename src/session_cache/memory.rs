use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{DeleteOutcome, ReplaceOutcome, SessionCache, SessionCacheError, SessionStatus};

/// Process-local session cache
///
/// Entries hold their expiry instant. Reads drop the entry they find
/// expired; every write sweeps all expired entries. Clones share the same map.
#[derive(Clone, Default)]
pub struct InMemorySessionCache {
    entries: Arc<DashMap<String, Instant>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including ones that expired but were not purged yet
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep(&self, now: Instant) {
        self.entries.retain(|_, expires_at| *expires_at > now);
    }
}

fn expiry(now: Instant, ttl: Duration) -> Result<Instant, SessionCacheError> {
    now.checked_add(ttl).ok_or(SessionCacheError::TtlOutOfRange(ttl))
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), SessionCacheError> {
        let now = Instant::now();
        let expires_at = expiry(now, ttl)?;
        self.sweep(now);
        self.entries.insert(key.to_string(), expires_at);
        Ok(())
    }

    async fn is_active(&self, key: &str) -> Result<SessionStatus, SessionCacheError> {
        let now = Instant::now();
        let expires_at = match self.entries.get(key) {
            Some(entry) => *entry.value(),
            None => return Ok(SessionStatus::Absent),
        };

        if expires_at <= now {
            self.entries.remove_if(key, |_, exp| *exp <= now);
            return Ok(SessionStatus::Absent);
        }
        Ok(SessionStatus::Active)
    }

    async fn atomic_replace(
        &self,
        old_key: &str,
        new_key: &str,
        ttl: Duration,
    ) -> Result<ReplaceOutcome, SessionCacheError> {
        let now = Instant::now();
        let new_expires_at = expiry(now, ttl)?;
        // The removal is the linearization point: only one caller gets the entry back
        let outcome = match self.entries.remove(old_key) {
            Some((_, expires_at)) if expires_at > now => {
                self.entries.insert(new_key.to_string(), new_expires_at);
                ReplaceOutcome::Replaced
            }
            _ => ReplaceOutcome::OldAbsent,
        };
        self.sweep(now);
        Ok(outcome)
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, SessionCacheError> {
        match self.entries.remove(key) {
            Some((_, expires_at)) if expires_at > Instant::now() => Ok(DeleteOutcome::Deleted),
            _ => Ok(DeleteOutcome::Absent),
        }
    }
}
