//! Credential facade used by login, refresh, logout and request
//! authentication.

use crate::error::TokenError;
use crate::jwt::{
    Claims, CredentialVerifier, IssuedPair, IssuedToken, Principal, Subject, TokenIssuer,
    TokenPair, TokenType,
};
use crate::metrics;
use crate::refresh::RefreshRotator;
use crate::user::{User, UserStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Issues, refreshes, revokes and authenticates credentials.
pub struct TokenService {
    issuer: Arc<TokenIssuer>,
    verifier: CredentialVerifier,
    rotator: RefreshRotator,
}

impl TokenService {
    /// Assemble the service from its parts.
    pub fn new(
        issuer: Arc<TokenIssuer>,
        verifier: CredentialVerifier,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let rotator = RefreshRotator::new(issuer.clone(), verifier.clone(), users);
        TokenService {
            issuer,
            verifier,
            rotator,
        }
    }

    /// Issue a single credential of `token_type`.
    pub fn issue(&self, subject: &Subject, token_type: TokenType) -> Result<IssuedToken, TokenError> {
        self.issuer.issue(subject, token_type)
    }

    /// Issue an access and refresh pair after a successful login.
    pub fn issue_for(&self, user: &User) -> Result<TokenPair, TokenError> {
        let pair: IssuedPair = self.issuer.issue_pair(&Subject::from(user))?;
        info!(user_id = %user.id, "Issued credential pair");
        Ok(pair.to_token_pair())
    }

    /// Decode a credential of either type, rejecting revoked ones.
    pub async fn decode(&self, raw: &str) -> Result<Claims, TokenError> {
        self.verifier.decode(raw).await
    }

    /// Exchange a refresh credential for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let pair = self.rotator.rotate(refresh_token).await?;
        Ok(pair.to_token_pair())
    }

    /// Revoke a credential until its natural expiry.
    ///
    /// Revoking an already revoked credential succeeds without effect.
    pub async fn revoke(&self, raw: &str) -> Result<(), TokenError> {
        let claims = self.verifier.codec().decode(raw)?;
        let newly_revoked = self
            .verifier
            .revocations()
            .revoke(&claims.jti, claims.expires_at())
            .await?;

        if newly_revoked {
            metrics::record_token_revoked("explicit");
            info!(
                jti = %claims.jti,
                user_id = %claims.sub,
                token_type = %claims.token_type,
                "Revoked credential"
            );
        } else {
            debug!(jti = %claims.jti, "Credential already revoked");
        }
        Ok(())
    }

    /// Validate an access credential and derive the caller.
    pub async fn authenticate(&self, raw: &str) -> Result<Principal, TokenError> {
        let claims = self.verifier.verify(raw, TokenType::Access).await?;
        Principal::try_from(claims)
    }

    /// Verifier used for every decode.
    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    /// Issuer used for every new credential.
    #[must_use]
    pub fn issuer(&self) -> &Arc<TokenIssuer> {
        &self.issuer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SigningKey;
    use crate::jwt::{SignedTokenCodec, TokenLifespans};
    use crate::revocation::InMemoryRevocationStore;
    use crate::user::InMemoryUserStore;
    use std::time::Duration;

    struct Fixture {
        clock: Arc<ManualClock>,
        users: Arc<InMemoryUserStore>,
        service: TokenService,
        user: User,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let codec = Arc::new(
            SignedTokenCodec::new(
                &SigningKey::hmac(b"test-secret-key-for-testing-only-32bytes".to_vec()),
                "camly",
                clock.clone(),
            )
            .unwrap(),
        );
        let revocations = Arc::new(InMemoryRevocationStore::new(clock.clone()));
        let users = Arc::new(InMemoryUserStore::new());
        let user = User::new("rosa", "rosa@camly.dev");
        users.save(&user).await.unwrap();

        let issuer = Arc::new(TokenIssuer::new(codec.clone(), TokenLifespans::default()));
        let verifier = CredentialVerifier::new(codec, revocations);
        let service = TokenService::new(issuer, verifier, users.clone());
        Fixture {
            clock,
            users,
            service,
            user,
        }
    }

    #[tokio::test]
    async fn test_refresh_rotates_once() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        let rotated = f.service.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);

        let err = f.service.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, TokenError::CredentialRevoked));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_credential() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        let err = f.service.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(
            err,
            TokenError::WrongCredentialType {
                expected: TokenType::Refresh,
                found: TokenType::Access
            }
        ));
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_current_user_state() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        let mut verified = f.user.clone();
        verified.email_verified = true;
        f.users.save(&verified).await.unwrap();

        let rotated = f.service.refresh(&pair.refresh_token).await.unwrap();
        let principal = f.service.authenticate(&rotated.access_token).await.unwrap();
        assert!(principal.email_verified);
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user_is_invalid() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();
        f.users.remove(f.user.id).await;

        let err = f.service.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, TokenError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_revoke_blocks_access_credential() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        f.service.revoke(&pair.access_token).await.unwrap();
        f.service.revoke(&pair.access_token).await.unwrap();

        let err = f.service.authenticate(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, TokenError::CredentialRevoked));
        let err = f.service.decode(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, TokenError::CredentialRevoked));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_credential() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        let err = f.service.authenticate(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, TokenError::WrongCredentialType { .. }));
    }

    #[tokio::test]
    async fn test_expired_refresh_is_invalid() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        f.clock.advance(Duration::from_secs(3600));
        let err = f.service.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, TokenError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_authenticate_yields_principal() {
        let f = fixture().await;
        let pair = f.service.issue_for(&f.user).unwrap();

        let principal = f.service.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(principal.user_id, f.user.id);
        assert_eq!(principal.username.as_deref(), Some("rosa"));
        assert!(principal.has_role("USER"));
    }
}
