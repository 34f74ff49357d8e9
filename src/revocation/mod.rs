//! Revoked credential ids, kept until the credential would have expired.

/// Process-local store with a background purge.
pub mod memory;
/// Redis-backed store shared across instances.
pub mod redis;

pub use memory::InMemoryRevocationStore;
pub use self::redis::RedisRevocationStore;

use crate::error::TokenError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for revoked credential ids (`jti`).
///
/// Entries only need to outlive the credential they block: once
/// `now > expires_at` the credential fails validation on expiry anyway, so
/// the entry may be purged.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Revoke `jti` until `expires_at`.
    ///
    /// Returns `true` when this call newly revoked the id, `false` when it was
    /// already revoked or the credential has already expired. The check and
    /// insert are atomic, so among concurrent callers exactly one sees `true`.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store is unreachable.
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, TokenError>;

    /// Whether `jti` is currently revoked.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store is unreachable.
    async fn is_revoked(&self, jti: &str) -> Result<bool, TokenError>;

    /// Drop entries whose credential expired before `now`. Returns the
    /// number of entries removed.
    ///
    /// # Errors
    ///
    /// `Storage` if the backing store is unreachable.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError>;
}
