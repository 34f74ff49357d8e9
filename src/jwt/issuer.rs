use crate::error::TokenError;
use crate::jwt::builder::ClaimsBuilder;
use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::codec::SignedTokenCodec;
use crate::metrics;
use crate::user::User;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Attributes of a user snapshotted into access credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// User id
    pub id: Uuid,
    /// Username
    pub username: String,
    /// Email
    pub email: String,
    /// Role names
    pub roles: Vec<String>,
    /// Email verification state
    pub email_verified: bool,
}

impl From<&User> for Subject {
    fn from(user: &User) -> Self {
        Subject {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            roles: user.roles(),
            email_verified: user.email_verified,
        }
    }
}

/// Configured credential lifespans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifespans {
    /// Access credential lifespan, 15 minutes by default
    pub access: Duration,
    /// Refresh credential lifespan, 1 hour by default
    pub refresh: Duration,
}

impl Default for TokenLifespans {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(15 * 60),
            refresh: Duration::from_secs(60 * 60),
        }
    }
}

impl TokenLifespans {
    /// Lifespan for `token_type`.
    #[must_use]
    pub const fn for_type(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access,
            TokenType::Refresh => self.refresh,
        }
    }
}

/// A freshly signed credential and the claims it was signed over.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact JWS
    pub token: String,
    /// Claims signed into `token`
    pub claims: Claims,
}

/// Access and refresh credentials issued together.
#[derive(Debug, Clone)]
pub struct IssuedPair {
    /// Access credential
    pub access: IssuedToken,
    /// Refresh credential
    pub refresh: IssuedToken,
}

impl IssuedPair {
    /// Response shape handed back to clients.
    #[must_use]
    pub fn to_token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access.token.clone(),
            refresh_token: self.refresh.token.clone(),
            expires_in: self.access.claims.lifespan_secs(),
        }
    }
}

/// Token response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    /// Access credential
    pub access_token: String,
    /// Refresh credential
    pub refresh_token: String,
    /// Access credential lifespan in seconds
    pub expires_in: i64,
}

/// Issues access and refresh credentials for a subject.
pub struct TokenIssuer {
    codec: Arc<SignedTokenCodec>,
    lifespans: TokenLifespans,
}

impl TokenIssuer {
    /// Issue through `codec` with `lifespans`.
    pub fn new(codec: Arc<SignedTokenCodec>, lifespans: TokenLifespans) -> Self {
        TokenIssuer { codec, lifespans }
    }

    /// Issue one credential. Every call draws a new `jti`, so repeated
    /// issuance yields independent, overlapping credentials.
    pub fn issue(&self, subject: &Subject, token_type: TokenType) -> Result<IssuedToken, TokenError> {
        let claims = ClaimsBuilder::new(self.codec.issuer(), token_type)
            .subject(subject)
            .lifespan(self.lifespans.for_type(token_type))
            .build(self.codec.clock().now())?;

        let token = self.codec.encode(&claims)?;
        metrics::record_token_issued(token_type.as_str(), self.codec.algorithm().as_str());

        debug!(
            user_id = %subject.id,
            jti = %claims.jti,
            token_type = %token_type,
            exp = claims.exp,
            "Issued credential"
        );

        Ok(IssuedToken { token, claims })
    }

    /// Issue an access credential followed by a refresh credential.
    pub fn issue_pair(&self, subject: &Subject) -> Result<IssuedPair, TokenError> {
        let access = self.issue(subject, TokenType::Access)?;
        let refresh = self.issue(subject, TokenType::Refresh)?;
        Ok(IssuedPair { access, refresh })
    }

    /// Configured lifespans.
    #[must_use]
    pub const fn lifespans(&self) -> TokenLifespans {
        self.lifespans
    }
}
