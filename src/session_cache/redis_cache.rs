use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult, Script};

use super::{
    ttl_seconds, DeleteOutcome, ReplaceOutcome, SessionCache, SessionCacheError, SessionStatus,
};
use crate::configuration::RedisSettings;

const ACTIVE_TOKEN: u8 = 1;

/// Delete KEYS[1]; only if it existed, store KEYS[2] with TTL ARGV[2].
/// Redis runs a script without interleaving other commands.
const ROTATE_SCRIPT: &str = r#"
if redis.call('DEL', KEYS[1]) == 1 then
    redis.call('SET', KEYS[2], ARGV[1], 'EX', ARGV[2])
    return 1
end
return 0
"#;

/// Redis-backed session cache, shared by every service instance
pub struct RedisSessionCache {
    conn: ConnectionManager,
    key_prefix: String,
    operation_timeout: Duration,
    rotate: Script,
}

impl RedisSessionCache {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, SessionCacheError> {
        let client = redis::Client::open(settings.url.as_str())?;
        let timeout = settings.operation_timeout();
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| SessionCacheError::Timeout(timeout))??;

        tracing::info!(key_prefix = %settings.key_prefix, "Connected to Redis");
        Ok(Self {
            conn,
            key_prefix: settings.key_prefix.clone(),
            operation_timeout: timeout,
            rotate: Script::new(ROTATE_SCRIPT),
        })
    }

    fn key(&self, token: &str) -> String {
        format!("{}{}", self.key_prefix, token)
    }

    /// Run one Redis round-trip under the configured deadline
    async fn bounded<T>(
        &self,
        op: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, SessionCacheError> {
        match tokio::time::timeout(self.operation_timeout, op).await {
            Ok(result) => result.map_err(SessionCacheError::from),
            Err(_) => Err(SessionCacheError::Timeout(self.operation_timeout)),
        }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), SessionCacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        self.bounded(conn.set_ex::<_, _, ()>(&key, ACTIVE_TOKEN, ttl_seconds(ttl)))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to save refresh token");
                e
            })
    }

    async fn is_active(&self, key: &str) -> Result<SessionStatus, SessionCacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        let exists: bool = self.bounded(conn.exists(&key)).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to look up refresh token");
            e
        })?;

        Ok(if exists {
            SessionStatus::Active
        } else {
            SessionStatus::Absent
        })
    }

    async fn atomic_replace(
        &self,
        old_key: &str,
        new_key: &str,
        ttl: Duration,
    ) -> Result<ReplaceOutcome, SessionCacheError> {
        let mut conn = self.conn.clone();
        let mut invocation = self.rotate.prepare_invoke();
        invocation
            .key(self.key(old_key))
            .key(self.key(new_key))
            .arg(ACTIVE_TOKEN)
            .arg(ttl_seconds(ttl));

        let replaced: i64 = self
            .bounded(invocation.invoke_async(&mut conn))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to rotate refresh token");
                e
            })?;

        Ok(if replaced == 1 {
            ReplaceOutcome::Replaced
        } else {
            ReplaceOutcome::OldAbsent
        })
    }

    async fn delete(&self, key: &str) -> Result<DeleteOutcome, SessionCacheError> {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        let deleted: u64 = self.bounded(conn.del(&key)).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to delete refresh token");
            e
        })?;

        Ok(if deleted == 0 {
            DeleteOutcome::Absent
        } else {
            DeleteOutcome::Deleted
        })
    }
}
