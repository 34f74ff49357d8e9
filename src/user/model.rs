use crate::action::ActionPurpose;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Authorization role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular account
    User,
    /// Administrator
    Admin,
}

impl Role {
    /// Name used in credential role claims.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

/// How the account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provider {
    /// Username or email with password
    Local,
    /// Google identity
    Google,
}

/// A stored action token. Absent slots mean no live token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTokenSlot {
    /// Opaque token value
    pub value: String,
    /// Instant from which the token is rejected
    pub expires_at: DateTime<Utc>,
}

impl ActionTokenSlot {
    /// `now >= expires_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for ActionTokenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTokenSlot")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// User record as seen by the auth core.
///
/// Persistence belongs to a [`UserStore`](crate::user::UserStore); the core
/// only reads and mutates these fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable account id, the `sub` of its credentials
    pub id: Uuid,
    /// Login name
    pub username: String,
    /// Account email
    pub email: String,
    /// Password hash; `None` for accounts without a local password
    pub password_hash: Option<String>,
    /// Sign-in provider
    pub provider: Provider,
    /// Set once the email verification flow completes
    pub email_verified: bool,
    /// Authorization role
    pub role: Role,
    email_verification: Option<ActionTokenSlot>,
    password_reset: Option<ActionTokenSlot>,
}

impl User {
    /// New local account with the `USER` role.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: None,
            provider: Provider::Local,
            email_verified: false,
            role: Role::User,
            email_verification: None,
            password_reset: None,
        }
    }

    /// Role names embedded in access credentials.
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        vec![self.role.as_str().to_string()]
    }

    /// Live token for `purpose`, if any.
    #[must_use]
    pub fn action_token(&self, purpose: ActionPurpose) -> Option<&ActionTokenSlot> {
        self.slot(purpose).as_ref()
    }

    /// Replace the token for `purpose`. Other purposes are untouched.
    pub fn set_action_token(&mut self, purpose: ActionPurpose, slot: ActionTokenSlot) {
        *self.slot_mut(purpose) = Some(slot);
    }

    /// Clear value and expiry for `purpose`.
    pub fn clear_action_token(&mut self, purpose: ActionPurpose) {
        *self.slot_mut(purpose) = None;
    }

    fn slot(&self, purpose: ActionPurpose) -> &Option<ActionTokenSlot> {
        match purpose {
            ActionPurpose::EmailVerification => &self.email_verification,
            ActionPurpose::PasswordReset => &self.password_reset,
        }
    }

    fn slot_mut(&mut self, purpose: ActionPurpose) -> &mut Option<ActionTokenSlot> {
        match purpose {
            ActionPurpose::EmailVerification => &mut self.email_verification,
            ActionPurpose::PasswordReset => &mut self.password_reset,
        }
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("provider", &self.provider)
            .field("email_verified", &self.email_verified)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}
