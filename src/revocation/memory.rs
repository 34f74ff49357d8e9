use crate::clock::Clock;
use crate::error::TokenError;
use crate::revocation::RevocationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Process-local revocation list.
#[derive(Debug)]
pub struct InMemoryRevocationStore {
    revoked: RwLock<HashMap<String, DateTime<Utc>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRevocationStore {
    /// Empty list reading expiry against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        InMemoryRevocationStore {
            revoked: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of retained entries.
    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }

    /// Whether no entries are retained.
    pub async fn is_empty(&self) -> bool {
        self.revoked.read().await.is_empty()
    }

    /// Purge expired entries every `interval` until the store is dropped.
    pub fn spawn_purge_task(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                purge_once(&*store, store.clock.now()).await;
            }
        })
    }
}

/// One purge pass; failures are logged and retried on the next tick.
async fn purge_once(store: &dyn RevocationStore, now: DateTime<Utc>) -> usize {
    match store.purge_expired(now).await {
        Ok(purged) => {
            if purged > 0 {
                debug!(purged, "Purged expired revocation entries");
            }
            purged
        }
        Err(e) => {
            warn!(error = %e, "Failed to purge revocation entries");
            0
        }
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<bool, TokenError> {
        if expires_at <= self.clock.now() {
            return Ok(false);
        }

        let mut revoked = self.revoked.write().await;
        if revoked.contains_key(jti) {
            return Ok(false);
        }
        revoked.insert(jti.to_string(), expires_at);
        Ok(true)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, TokenError> {
        Ok(self.revoked.read().await.contains_key(jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at >= now);
        Ok(before - revoked.len())
    }
}
