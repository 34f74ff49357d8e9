use serde::{Deserialize, Serialize};
use std::fmt;

/// What an action token authorizes. Each purpose has its own slot on the
/// user record, so purposes never interfere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPurpose {
    /// Confirms ownership of the account email
    EmailVerification,
    /// Authorizes setting a new password
    PasswordReset,
}

impl ActionPurpose {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

impl fmt::Display for ActionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
