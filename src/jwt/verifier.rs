use crate::error::TokenError;
use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::codec::SignedTokenCodec;
use crate::revocation::RevocationStore;
use std::sync::Arc;
use tracing::debug;

/// Full credential validation: signature and expiry through the codec,
/// then the revocation list, then the declared type.
#[derive(Clone)]
pub struct CredentialVerifier {
    codec: Arc<SignedTokenCodec>,
    revocations: Arc<dyn RevocationStore>,
}

impl CredentialVerifier {
    /// Verify with `codec`, consulting `revocations`.
    pub fn new(codec: Arc<SignedTokenCodec>, revocations: Arc<dyn RevocationStore>) -> Self {
        CredentialVerifier { codec, revocations }
    }

    /// Decode and reject revoked credentials, whatever their type.
    pub async fn decode(&self, raw: &str) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(raw)?;
        self.ensure_not_revoked(&claims).await?;
        Ok(claims)
    }

    /// Decode, require `expected` type, and reject revoked credentials.
    pub async fn verify(&self, raw: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = self.codec.decode(raw)?;

        if claims.token_type != expected {
            return Err(TokenError::WrongCredentialType {
                expected,
                found: claims.token_type,
            });
        }

        self.ensure_not_revoked(&claims).await?;
        Ok(claims)
    }

    async fn ensure_not_revoked(&self, claims: &Claims) -> Result<(), TokenError> {
        if self.revocations.is_revoked(&claims.jti).await? {
            debug!(jti = %claims.jti, "Rejected revoked credential");
            return Err(TokenError::CredentialRevoked);
        }
        Ok(())
    }

    /// Codec used for decoding.
    #[must_use]
    pub fn codec(&self) -> &Arc<SignedTokenCodec> {
        &self.codec
    }

    /// Revocation list consulted after decoding.
    #[must_use]
    pub fn revocations(&self) -> &Arc<dyn RevocationStore> {
        &self.revocations
    }
}
