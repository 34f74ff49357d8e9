use crate::action::ActionPurpose;
use crate::error::TokenError;
use crate::user::model::{ActionTokenSlot, User};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Change applied to a user while its action token is consumed.
pub type UserMutation<'a> = Box<dyn FnOnce(&mut User) -> Result<(), TokenError> + Send + 'a>;

/// Persistent user storage consumed by the auth core.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, TokenError>;

    /// Look up a user by email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, TokenError>;

    /// Find the user holding a token with exactly `value` for `purpose`.
    async fn find_by_action_token(
        &self,
        value: &str,
        purpose: ActionPurpose,
    ) -> Result<Option<User>, TokenError>;

    /// Insert or replace the user record.
    async fn save(&self, user: &User) -> Result<(), TokenError>;

    /// Set the `purpose` slot of an existing user, leaving every other
    /// field as stored.
    ///
    /// Returns `false` if the user does not exist.
    async fn store_action_token(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        slot: ActionTokenSlot,
    ) -> Result<bool, TokenError>;

    /// Apply `mutate` and clear the `purpose` slot in one step, only if the
    /// slot still holds `expected`.
    ///
    /// Returns the updated user, or `None` if the slot no longer matches.
    /// Nothing is written when `mutate` fails. A database implements this as
    /// a conditional update on the slot value.
    async fn consume_action_token(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        expected: &str,
        mutate: UserMutation<'_>,
    ) -> Result<Option<User>, TokenError>;
}

/// Map-backed store for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store holds no users.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Remove a user, returning the record if it existed.
    pub async fn remove(&self, id: Uuid) -> Option<User> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, TokenError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, TokenError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_action_token(
        &self,
        value: &str,
        purpose: ActionPurpose,
    ) -> Result<Option<User>, TokenError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.action_token(purpose).is_some_and(|slot| slot.value == value))
            .cloned())
    }

    async fn save(&self, user: &User) -> Result<(), TokenError> {
        self.users.write().await.insert(user.id, user.clone());
        Ok(())
    }

    async fn store_action_token(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        slot: ActionTokenSlot,
    ) -> Result<bool, TokenError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user_id) {
            Some(user) => {
                user.set_action_token(purpose, slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_action_token(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        expected: &str,
        mutate: UserMutation<'_>,
    ) -> Result<Option<User>, TokenError> {
        let mut users = self.users.write().await;
        let Some(stored) = users.get_mut(&user_id) else {
            return Ok(None);
        };
        if !stored
            .action_token(purpose)
            .is_some_and(|slot| slot.value == expected)
        {
            return Ok(None);
        }

        let mut updated = stored.clone();
        mutate(&mut updated)?;
        updated.clear_action_token(purpose);
        *stored = updated.clone();
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn slot(value: &str) -> ActionTokenSlot {
        ActionTokenSlot {
            value: value.to_string(),
            expires_at: Utc::now(),
        }
    }

    fn mutation(
        f: impl FnOnce(&mut User) -> Result<(), TokenError> + Send + 'static,
    ) -> UserMutation<'static> {
        Box::new(f)
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = InMemoryUserStore::new();
        let user = User::new("lin", "lin@camly.dev");
        store.save(&user).await.unwrap();

        assert_eq!(store.find_by_id(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_by_email("lin@camly.dev").await.unwrap(), Some(user));
        assert!(store.find_by_email("other@camly.dev").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_action_token_respects_purpose() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("lin", "lin@camly.dev");
        user.set_action_token(
            ActionPurpose::PasswordReset,
            ActionTokenSlot {
                value: "abc".to_string(),
                expires_at: Utc::now(),
            },
        );
        store.save(&user).await.unwrap();

        assert!(store
            .find_by_action_token("abc", ActionPurpose::PasswordReset)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_action_token("abc", ActionPurpose::EmailVerification)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_consume_only_matching_slot() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("lin", "lin@camly.dev");
        user.set_action_token(ActionPurpose::EmailVerification, slot("verify"));
        user.set_action_token(ActionPurpose::PasswordReset, slot("reset"));
        store.save(&user).await.unwrap();

        let stale = store
            .consume_action_token(user.id, ActionPurpose::PasswordReset, "other", mutation(|_| Ok(())))
            .await
            .unwrap();
        assert!(stale.is_none());

        let updated = store
            .consume_action_token(
                user.id,
                ActionPurpose::PasswordReset,
                "reset",
                mutation(|u| {
                    u.password_hash = Some("hashed".to_string());
                    Ok(())
                }),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.password_hash.as_deref(), Some("hashed"));
        assert!(updated.action_token(ActionPurpose::PasswordReset).is_none());
        assert!(updated.action_token(ActionPurpose::EmailVerification).is_some());

        let again = store
            .consume_action_token(user.id, ActionPurpose::PasswordReset, "reset", mutation(|_| Ok(())))
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("lin", "lin@camly.dev");
        user.set_action_token(ActionPurpose::PasswordReset, slot("reset"));
        store.save(&user).await.unwrap();

        let err = store
            .consume_action_token(
                user.id,
                ActionPurpose::PasswordReset,
                "reset",
                mutation(|u| {
                    u.email_verified = true;
                    Err(TokenError::BadRequest("rejected".to_string()))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::BadRequest(_)));

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored, user);
    }

    #[tokio::test]
    async fn test_store_action_token_keeps_other_fields() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("lin", "lin@camly.dev");
        user.set_action_token(ActionPurpose::PasswordReset, slot("reset"));
        store.save(&user).await.unwrap();

        assert!(store
            .store_action_token(user.id, ActionPurpose::EmailVerification, slot("verify"))
            .await
            .unwrap());
        assert!(!store
            .store_action_token(Uuid::new_v4(), ActionPurpose::EmailVerification, slot("x"))
            .await
            .unwrap());

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.action_token(ActionPurpose::PasswordReset).unwrap().value, "reset");
        assert_eq!(stored.action_token(ActionPurpose::EmailVerification).unwrap().value, "verify");
    }
}
