use crate::error::TokenError;
use crate::jwt::{CredentialVerifier, IssuedPair, Subject, TokenIssuer, TokenType};
use crate::metrics;
use crate::user::UserStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Exchanges a refresh credential for a new access and refresh pair.
pub struct RefreshRotator {
    issuer: Arc<TokenIssuer>,
    verifier: CredentialVerifier,
    users: Arc<dyn UserStore>,
}

impl RefreshRotator {
    /// Rotate with `issuer`, checking credentials through `verifier`.
    pub fn new(
        issuer: Arc<TokenIssuer>,
        verifier: CredentialVerifier,
        users: Arc<dyn UserStore>,
    ) -> Self {
        RefreshRotator {
            issuer,
            verifier,
            users,
        }
    }

    /// Rotate `refresh_token`.
    ///
    /// The consumed credential is revoked only after the new pair has been
    /// issued. When two callers present the same credential, the atomic
    /// revoke lets exactly one of them keep its new pair.
    ///
    /// # Errors
    ///
    /// - `InvalidCredential` for undecodable or expired input, or a subject
    ///   that no longer exists
    /// - `WrongCredentialType` if an access credential is presented
    /// - `CredentialRevoked` for a replayed or concurrently rotated credential
    pub async fn rotate(&self, refresh_token: &str) -> Result<IssuedPair, TokenError> {
        let claims = match self.verifier.verify(refresh_token, TokenType::Refresh).await {
            Ok(claims) => claims,
            Err(TokenError::CredentialRevoked) => {
                metrics::record_token_refreshed("replayed");
                warn!("Revoked refresh credential presented for rotation");
                return Err(TokenError::CredentialRevoked);
            }
            Err(e) => {
                metrics::record_token_refreshed("rejected");
                return Err(e);
            }
        };

        let user_id = claims.subject_id()?;
        let user = self.users.find_by_id(user_id).await?.ok_or_else(|| {
            warn!(user_id = %user_id, "Refresh credential for unknown user");
            TokenError::InvalidCredential
        })?;

        let pair = self.issuer.issue_pair(&Subject::from(&user))?;

        let revoked = self
            .verifier
            .revocations()
            .revoke(&claims.jti, claims.expires_at())
            .await?;
        if !revoked {
            let now = self.verifier.codec().clock().now();
            if claims.is_expired_at(now.timestamp()) {
                metrics::record_token_refreshed("expired");
                return Err(TokenError::InvalidCredential);
            }
            metrics::record_token_refreshed("race_lost");
            warn!(
                jti = %claims.jti,
                user_id = %user_id,
                "Refresh credential rotated concurrently, discarding new pair"
            );
            return Err(TokenError::CredentialRevoked);
        }

        metrics::record_token_refreshed("success");
        info!(
            user_id = %user_id,
            old_jti = %claims.jti,
            new_jti = %pair.refresh.claims.jti,
            "Rotated refresh credential"
        );

        Ok(pair)
    }
}
