use crate::clock::Clock;
use crate::error::TokenError;
use crate::revocation::RevocationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use tracing::info;

/// Revocation list shared across instances through Redis.
///
/// Each id is stored as `revoked:<jti>` with a TTL equal to the remaining
/// credential lifespan, so Redis expires entries on its own.
#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
    clock: Arc<dyn Clock>,
}

impl RedisRevocationStore {
    /// Connect through a managed connection that reconnects on failure.
    pub async fn connect(redis_url: &str, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;

        info!("Connected revocation store to Redis");
        Ok(RedisRevocationStore { conn, clock })
    }

    fn key(jti: &str) -> String {
        format!("revoked:{}", jti)
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, TokenError> {
        let remaining_ms = (expires_at - self.clock.now()).num_milliseconds();
        if remaining_ms <= 0 {
            return Ok(false);
        }

        let mut conn = self.conn.clone();
        // SET NX answers OK only for the caller that created the key
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::key(jti))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(remaining_ms)
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, TokenError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(Self::key(jti)).await?;
        Ok(exists)
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, TokenError> {
        // Key TTLs already evict expired entries
        Ok(0)
    }
}
