use crate::error::TokenError;
use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::issuer::Subject;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Assembles a claim set for one credential.
pub struct ClaimsBuilder {
    issuer: String,
    subject: Option<String>,
    token_type: TokenType,
    lifespan: Duration,
    snapshot: Option<Subject>,
}

impl ClaimsBuilder {
    /// Start a claim set of `token_type` issued by `issuer`.
    pub fn new(issuer: impl Into<String>, token_type: TokenType) -> Self {
        ClaimsBuilder {
            issuer: issuer.into(),
            subject: None,
            token_type,
            lifespan: Duration::from_secs(900), // 15 minutes default
            snapshot: None,
        }
    }

    /// Bind the credential to `subject`.
    pub fn subject(mut self, subject: &Subject) -> Self {
        self.subject = Some(subject.id.to_string());
        if self.token_type == TokenType::Access {
            self.snapshot = Some(subject.clone());
        }
        self
    }

    /// Time from issuance to expiry.
    pub fn lifespan(mut self, lifespan: Duration) -> Self {
        self.lifespan = lifespan;
        self
    }

    /// Stamp `iat`/`exp` from `issued_at` and draw a fresh `jti`.
    pub fn build(self, issued_at: DateTime<Utc>) -> Result<Claims, TokenError> {
        let sub = self
            .subject
            .ok_or_else(|| TokenError::internal("subject is required"))?;
        let lifespan = i64::try_from(self.lifespan.as_secs())
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| TokenError::config("credential lifespan must be positive"))?;

        let iat = issued_at.timestamp();
        let mut claims = Claims {
            iss: self.issuer,
            sub,
            iat,
            exp: iat + lifespan,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: self.token_type,
            roles: None,
            username: None,
            email: None,
            email_verified: None,
        };

        if let Some(snapshot) = self.snapshot {
            claims.roles = Some(snapshot.roles);
            claims.username = Some(snapshot.username);
            claims.email = Some(snapshot.email);
            claims.email_verified = Some(snapshot.email_verified);
        }

        Ok(claims)
    }
}
