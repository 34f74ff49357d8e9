//! Signed credential encoding and verification.

use crate::clock::Clock;
use crate::config::{JwtAlgorithm, SigningKey};
use crate::error::TokenError;
use crate::jwt::claims::Claims;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

/// Shortest HMAC secret accepted, in bytes.
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

/// Encodes claim sets into compact JWS strings and verifies them back.
///
/// Decoding checks signature, structure, issuer and expiry. Expiry is
/// evaluated against the injected clock rather than the library's own
/// wall-clock check, with the expiry instant itself treated as expired.
pub struct SignedTokenCodec {
    algorithm: JwtAlgorithm,
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl SignedTokenCodec {
    /// Build a codec from key material.
    ///
    /// # Errors
    ///
    /// Returns `Config` or `Signer` if the key material is unusable. Both
    /// are startup failures.
    pub fn new(
        key: &SigningKey,
        issuer: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        let (encoding_key, decoding_key) = match key {
            SigningKey::Hmac { secret, .. } => {
                if secret.len() < MIN_HMAC_SECRET_BYTES {
                    return Err(TokenError::config(format!(
                        "HMAC secret must be at least {MIN_HMAC_SECRET_BYTES} bytes, got {}",
                        secret.len()
                    )));
                }
                (
                    EncodingKey::from_secret(secret.expose()),
                    DecodingKey::from_secret(secret.expose()),
                )
            }
            SigningKey::Rsa {
                private_pem,
                public_pem,
            } => (
                EncodingKey::from_rsa_pem(private_pem.expose())
                    .map_err(|e| TokenError::signer(format!("Invalid RSA private key: {e}")))?,
                DecodingKey::from_rsa_pem(public_pem)
                    .map_err(|e| TokenError::signer(format!("Invalid RSA public key: {e}")))?,
            ),
        };

        let issuer = issuer.into();
        let algorithm = key.algorithm();

        let mut validation = Validation::new(algorithm.to_jsonwebtoken());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[issuer.as_str()]);

        Ok(Self {
            algorithm,
            issuer,
            encoding_key,
            decoding_key,
            validation,
            clock,
        })
    }

    /// Sign a claim set.
    ///
    /// # Errors
    ///
    /// `Signer` when the key cannot sign.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm.to_jsonwebtoken());
        encode(&header, claims, &self.encoding_key).map_err(|e| TokenError::signer(e.to_string()))
    }

    /// Verify a credential and return its claims.
    ///
    /// # Errors
    ///
    /// `InvalidCredential` for bad signature, malformed structure, foreign
    /// issuer, or `now >= exp`.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.exp <= claims.iat {
            return Err(TokenError::InvalidCredential);
        }
        if claims.is_expired_at(self.clock.now().timestamp()) {
            return Err(TokenError::InvalidCredential);
        }

        Ok(claims)
    }

    /// Issuer stamped into and required from every credential.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signing algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// Clock used for expiry checks.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
