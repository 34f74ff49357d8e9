use crate::error::TokenError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declared credential type, carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Authenticates ordinary API calls
    Access,
    /// Exchanged for a new pair at the refresh endpoint
    Refresh,
}

impl TokenType {
    /// Claim value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claim set of a signed credential.
///
/// Access credentials carry a snapshot of the subject taken at issuance.
/// Refresh credentials carry only the registered claims and `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    // Registered claims
    /// Issuer
    pub iss: String,
    /// User id
    pub sub: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch; rejected from this instant on
    pub exp: i64,
    /// Unique credential id, the revocation key
    pub jti: String,

    /// Credential type, `type` on the wire
    #[serde(rename = "type")]
    pub token_type: TokenType,

    // Subject snapshot, access credentials only
    /// Role names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Username at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Email at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Email verification state at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl Claims {
    /// Parse `sub` as a user id.
    ///
    /// # Errors
    ///
    /// `InvalidCredential` when `sub` is not a UUID.
    pub fn subject_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::InvalidCredential)
    }

    /// Expired at `now` (seconds). The expiry instant itself is invalid.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Lifespan in seconds.
    #[must_use]
    pub const fn lifespan_secs(&self) -> i64 {
        self.exp - self.iat
    }
}
