use crate::action::generator::SecureTokenGenerator;
use crate::action::purpose::ActionPurpose;
use crate::clock::Clock;
use crate::error::TokenError;
use crate::metrics;
use crate::user::{ActionTokenSlot, User, UserStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

/// Configured action token lifespans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionTokenLifespans {
    /// Email verification lifespan, 6 hours by default
    pub email_verification: Duration,
    /// Password reset lifespan, 1 hour by default
    pub password_reset: Duration,
}

impl Default for ActionTokenLifespans {
    fn default() -> Self {
        Self {
            email_verification: Duration::from_secs(6 * 60 * 60),
            password_reset: Duration::from_secs(60 * 60),
        }
    }
}

impl ActionTokenLifespans {
    /// Lifespan for `purpose`.
    #[must_use]
    pub const fn for_purpose(&self, purpose: ActionPurpose) -> Duration {
        match purpose {
            ActionPurpose::EmailVerification => self.email_verification,
            ActionPurpose::PasswordReset => self.password_reset,
        }
    }
}

/// A freshly issued action token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTokenGrant {
    /// Owner of the token
    pub user_id: Uuid,
    /// What the token authorizes
    pub purpose: ActionPurpose,
    /// Token value to hand to the user
    pub value: String,
    /// Instant from which redemption fails
    pub expires_at: DateTime<Utc>,
    /// Lifespan the token was issued with
    pub lifespan: Duration,
}

/// Issues and redeems single-use action tokens stored on user records.
pub struct ActionTokenService {
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    lifespans: ActionTokenLifespans,
}

impl ActionTokenService {
    /// Store tokens on records in `users`.
    pub fn new(
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
        lifespans: ActionTokenLifespans,
    ) -> Self {
        ActionTokenService {
            users,
            clock,
            lifespans,
        }
    }

    /// Issue a token for `purpose` with the configured lifespan.
    pub async fn issue(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
    ) -> Result<ActionTokenGrant, TokenError> {
        self.issue_with_lifespan(user_id, purpose, self.lifespans.for_purpose(purpose))
            .await
    }

    /// Issue a token for `purpose`, replacing any previous one of the same
    /// purpose.
    pub async fn issue_with_lifespan(
        &self,
        user_id: Uuid,
        purpose: ActionPurpose,
        lifespan: Duration,
    ) -> Result<ActionTokenGrant, TokenError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(TokenError::UserNotFound)?;
        self.issue_to_user(user, purpose, lifespan).await
    }

    /// Issue against an already loaded user record.
    ///
    /// Only the `purpose` slot is written; the rest of `user` may be stale.
    pub async fn issue_to_user(
        &self,
        user: User,
        purpose: ActionPurpose,
        lifespan: Duration,
    ) -> Result<ActionTokenGrant, TokenError> {
        if lifespan.is_zero() {
            return Err(TokenError::config("action token lifespan must be greater than 0"));
        }
        let ttl = chrono::Duration::from_std(lifespan)
            .map_err(|e| TokenError::config(format!("action token lifespan: {}", e)))?;

        let value = SecureTokenGenerator::generate();
        let expires_at = self.clock.now() + ttl;

        let slot = ActionTokenSlot {
            value: value.clone(),
            expires_at,
        };
        if !self.users.store_action_token(user.id, purpose, slot).await? {
            return Err(TokenError::UserNotFound);
        }

        metrics::record_action_token(purpose.as_str(), "issued");
        info!(user_id = %user.id, purpose = %purpose, %expires_at, "Issued action token");

        Ok(ActionTokenGrant {
            user_id: user.id,
            purpose,
            value,
            expires_at,
            lifespan,
        })
    }

    /// Consume a token and return the bound user id.
    pub async fn redeem(&self, value: &str, purpose: ActionPurpose) -> Result<Uuid, TokenError> {
        self.redeem_with(value, purpose, |_| Ok(())).await
    }

    /// Consume a token after running `action` on its user.
    ///
    /// `action` runs and the slot is cleared in one store update that only
    /// applies while the slot still holds `value`, so concurrent redemptions
    /// of one token have a single winner. An expired token or a failing
    /// action leaves the token in place.
    ///
    /// # Errors
    ///
    /// - `ActionTokenNotFound` if no live token has this value for `purpose`
    /// - `ActionTokenExpired` if `now >= expires_at`
    /// - whatever `action` or the user store returns
    pub async fn redeem_with<F>(
        &self,
        value: &str,
        purpose: ActionPurpose,
        action: F,
    ) -> Result<Uuid, TokenError>
    where
        F: FnOnce(&mut User) -> Result<(), TokenError> + Send,
    {
        if value.is_empty() {
            return Err(TokenError::ActionTokenNotFound);
        }

        let user = self
            .users
            .find_by_action_token(value, purpose)
            .await?
            .ok_or_else(|| {
                metrics::record_action_token(purpose.as_str(), "not_found");
                TokenError::ActionTokenNotFound
            })?;

        let slot = user
            .action_token(purpose)
            .ok_or(TokenError::ActionTokenNotFound)?;
        if !bool::from(slot.value.as_bytes().ct_eq(value.as_bytes())) {
            return Err(TokenError::ActionTokenNotFound);
        }
        if slot.is_expired_at(self.clock.now()) {
            metrics::record_action_token(purpose.as_str(), "expired");
            warn!(user_id = %user.id, purpose = %purpose, "Rejected expired action token");
            return Err(TokenError::ActionTokenExpired);
        }

        let consumed = self
            .users
            .consume_action_token(user.id, purpose, value, Box::new(action))
            .await?;
        if consumed.is_none() {
            metrics::record_action_token(purpose.as_str(), "not_found");
            warn!(user_id = %user.id, purpose = %purpose, "Action token consumed concurrently");
            return Err(TokenError::ActionTokenNotFound);
        }

        metrics::record_action_token(purpose.as_str(), "redeemed");
        info!(user_id = %user.id, purpose = %purpose, "Redeemed action token");
        Ok(user.id)
    }

    /// Configured lifespans.
    #[must_use]
    pub const fn lifespans(&self) -> ActionTokenLifespans {
        self.lifespans
    }

    pub(crate) fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }
}
