//! Read-through cache in front of a [`UserStore`].
//!
//! Lookups by id and email are cached; action-token lookups always hit the
//! backing store so a stale entry can never bring back a consumed token.

use crate::action::ActionPurpose;
use crate::error::TokenError;
use crate::metrics;
use crate::user::model::{ActionTokenSlot, User};
use crate::user::store::{UserMutation, UserStore};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// LRU-cached user store.
pub struct CachedUserStore {
    inner: Arc<dyn UserStore>,
    by_id: RwLock<LruCache<Uuid, User>>,
    by_email: RwLock<LruCache<String, Uuid>>,
}

impl CachedUserStore {
    /// Cache up to `capacity` users in front of `inner`.
    pub fn new(inner: Arc<dyn UserStore>, capacity: NonZeroUsize) -> Self {
        CachedUserStore {
            inner,
            by_id: RwLock::new(LruCache::new(capacity)),
            by_email: RwLock::new(LruCache::new(capacity)),
        }
    }

    async fn cached(&self, id: &Uuid) -> Option<User> {
        self.by_id.read().await.peek(id).cloned()
    }

    async fn remember(&self, user: &User) {
        self.by_id.write().await.put(user.id, user.clone());
        self.by_email.write().await.put(user.email.clone(), user.id);
    }

    async fn forget(&self, id: Uuid) {
        let previous = self.by_id.write().await.pop(&id);
        if let Some(previous) = previous {
            self.by_email.write().await.pop(&previous.email);
        }
    }
}

#[async_trait]
impl UserStore for CachedUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, TokenError> {
        if let Some(user) = self.cached(&id).await {
            metrics::record_cache_operation("find_by_id", "hit");
            return Ok(Some(user));
        }
        metrics::record_cache_operation("find_by_id", "miss");

        let found = self.inner.find_by_id(id).await?;
        if let Some(ref user) = found {
            self.remember(user).await;
        }
        Ok(found)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, TokenError> {
        let id = self.by_email.read().await.peek(email).copied();
        if let Some(id) = id {
            if let Some(user) = self.cached(&id).await {
                if user.email == email {
                    metrics::record_cache_operation("find_by_email", "hit");
                    return Ok(Some(user));
                }
            }
        }
        metrics::record_cache_operation("find_by_email", "miss");

        let found = self.inner.find_by_email(email).await?;
        if let Some(ref user) = found {
            self.remember(user).await;
        }
        Ok(found)
    }

    async fn find_by_action_token(
        &self,
        value: &str,
        purpose: ActionPurpose,
    ) -> Result<Option<User>, TokenError> {
        self.inner.find_by_action_token(value, purpose).await
    }

    async fn save(&self, user: &User) -> Result<(), TokenError> {
        self.inner.save(user).await?;
        self.forget(user.id).await;
        debug!(user_id = %user.id, "Invalidated cached user");
        Ok(())
    }

    async fn store_action_token(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        slot: ActionTokenSlot,
    ) -> Result<bool, TokenError> {
        let stored = self.inner.store_action_token(user_id, purpose, slot).await?;
        self.forget(user_id).await;
        Ok(stored)
    }

    async fn consume_action_token(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        expected: &str,
        mutate: UserMutation<'_>,
    ) -> Result<Option<User>, TokenError> {
        let updated = self
            .inner
            .consume_action_token(user_id, purpose, expected, mutate)
            .await?;
        if updated.is_some() {
            self.forget(user_id).await;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::store::InMemoryUserStore;

    fn cached(inner: Arc<InMemoryUserStore>) -> CachedUserStore {
        CachedUserStore::new(inner, NonZeroUsize::new(8).unwrap())
    }

    #[tokio::test]
    async fn test_save_invalidates_cached_entry() {
        let inner = Arc::new(InMemoryUserStore::new());
        let store = cached(inner.clone());
        let mut user = User::new("kim", "kim@camly.dev");
        store.save(&user).await.unwrap();

        assert!(!store.find_by_id(user.id).await.unwrap().unwrap().email_verified);

        user.email_verified = true;
        store.save(&user).await.unwrap();

        assert!(store.find_by_id(user.id).await.unwrap().unwrap().email_verified);
    }

    #[tokio::test]
    async fn test_cached_read_survives_backing_removal() {
        let inner = Arc::new(InMemoryUserStore::new());
        let store = cached(inner.clone());
        let user = User::new("kim", "kim@camly.dev");
        store.save(&user).await.unwrap();

        store.find_by_email("kim@camly.dev").await.unwrap();
        inner.remove(user.id).await;

        assert_eq!(store.find_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_by_email("kim@camly.dev").await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_action_token_lookup_bypasses_cache() {
        let inner = Arc::new(InMemoryUserStore::new());
        let store = cached(inner.clone());
        let user = User::new("kim", "kim@camly.dev");
        store.save(&user).await.unwrap();
        store.find_by_id(user.id).await.unwrap();

        let mut updated = user.clone();
        updated.set_action_token(
            ActionPurpose::EmailVerification,
            crate::user::model::ActionTokenSlot {
                value: "fresh".to_string(),
                expires_at: chrono::Utc::now(),
            },
        );
        inner.save(&updated).await.unwrap();

        assert!(store
            .find_by_action_token("fresh", ActionPurpose::EmailVerification)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_consume_invalidates_cached_entry() {
        let inner = Arc::new(InMemoryUserStore::new());
        let store = cached(inner.clone());
        let user = User::new("kim", "kim@camly.dev");
        store.save(&user).await.unwrap();

        let slot = ActionTokenSlot {
            value: "verify".to_string(),
            expires_at: chrono::Utc::now(),
        };
        store
            .store_action_token(user.id, ActionPurpose::EmailVerification, slot)
            .await
            .unwrap();
        assert!(store
            .find_by_id(user.id)
            .await
            .unwrap()
            .unwrap()
            .action_token(ActionPurpose::EmailVerification)
            .is_some());

        let mutate: UserMutation<'static> = Box::new(|u: &mut User| {
            u.email_verified = true;
            Ok(())
        });
        store
            .consume_action_token(user.id, ActionPurpose::EmailVerification, "verify", mutate)
            .await
            .unwrap()
            .unwrap();

        let cached = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(cached.email_verified);
        assert!(cached.action_token(ActionPurpose::EmailVerification).is_none());
    }
}
