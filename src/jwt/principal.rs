use crate::error::TokenError;
use crate::jwt::claims::Claims;
use uuid::Uuid;

/// Authenticated caller, derived from a verified access credential and
/// passed explicitly to handlers through request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Authenticated user
    pub user_id: Uuid,
    /// Id of the presented credential
    pub jti: String,
    /// Credential expiry, seconds since the epoch
    pub expires_at: i64,
    /// Role names
    pub roles: Vec<String>,
    /// Username at issuance
    pub username: Option<String>,
    /// Email at issuance
    pub email: Option<String>,
    /// Email verification state at issuance
    pub email_verified: bool,
}

impl Principal {
    /// Whether `role` is among the caller's roles.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl TryFrom<Claims> for Principal {
    type Error = TokenError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Principal {
            user_id: claims.subject_id()?,
            jti: claims.jti,
            expires_at: claims.exp,
            roles: claims.roles.unwrap_or_default(),
            username: claims.username,
            email: claims.email,
            email_verified: claims.email_verified.unwrap_or(false),
        })
    }
}
