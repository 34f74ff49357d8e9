//! Centralized configuration for the auth core.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. Bad key material is fatal here, never per request.

use crate::action::ActionTokenLifespans;
use crate::error::TokenError;
use crate::jwt::TokenLifespans;
use crate::observability::LogFormat;
use jsonwebtoken::Algorithm;
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// JWT signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    /// HMAC with SHA-256
    HS256,
    /// HMAC with SHA-384
    HS384,
    /// HMAC with SHA-512
    HS512,
    /// RSA with SHA-256
    RS256,
}

impl JwtAlgorithm {
    /// Parse algorithm from string.
    pub fn from_str(s: &str) -> Result<Self, TokenError> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            "RS256" => Ok(Self::RS256),
            _ => Err(TokenError::config(format!("Invalid JWT algorithm: {}", s))),
        }
    }

    /// Get algorithm name for JWT header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
        }
    }

    /// Whether the algorithm uses a shared secret.
    #[must_use]
    pub const fn is_hmac(&self) -> bool {
        !matches!(self, Self::RS256)
    }

    pub(crate) const fn to_jsonwebtoken(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
        }
    }
}

/// Byte buffer wiped on drop and redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Wrap secret bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes([REDACTED; {}])", self.0.len())
    }
}

/// Key material for signing credentials.
#[derive(Debug, Clone)]
pub enum SigningKey {
    /// Shared secret
    Hmac {
        /// HS256, HS384 or HS512
        algorithm: JwtAlgorithm,
        /// Secret bytes
        secret: SecretBytes,
    },
    /// RSA key pair in PEM form
    Rsa {
        /// PKCS#1 or PKCS#8 private key
        private_pem: SecretBytes,
        /// Public key
        public_pem: Vec<u8>,
    },
}

impl SigningKey {
    /// HS256 key from a shared secret.
    #[must_use]
    pub fn hmac(secret: Vec<u8>) -> Self {
        Self::Hmac {
            algorithm: JwtAlgorithm::HS256,
            secret: SecretBytes::new(secret),
        }
    }

    /// RS256 key pair from PEM bytes.
    #[must_use]
    pub fn rsa(private_pem: Vec<u8>, public_pem: Vec<u8>) -> Self {
        Self::Rsa {
            private_pem: SecretBytes::new(private_pem),
            public_pem,
        }
    }

    /// Algorithm this key signs with.
    #[must_use]
    pub const fn algorithm(&self) -> JwtAlgorithm {
        match self {
            Self::Hmac { algorithm, .. } => *algorithm,
            Self::Rsa { .. } => JwtAlgorithm::RS256,
        }
    }
}

/// Auth core configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // JWT settings
    /// JWT issuer claim
    pub jwt_issuer: String,
    /// Signing key material
    pub signing_key: SigningKey,
    /// Access and refresh lifespans
    pub token_lifespans: TokenLifespans,

    // Action tokens
    /// Email verification and password reset lifespans
    pub action_lifespans: ActionTokenLifespans,

    // Storage
    /// Redis URL for the revocation list; in-memory when absent
    pub redis_url: Option<String>,
    /// How often the in-memory revocation list drops expired entries
    pub revocation_purge_interval: Duration,
    /// Capacity of the user read-through cache, 0 disables it
    pub user_cache_capacity: usize,

    // Observability
    /// Log output format
    pub log_format: LogFormat,
}

impl Config {
    /// Defaults around an HS256 secret.
    #[must_use]
    pub fn with_secret(secret: Vec<u8>) -> Self {
        Self {
            jwt_issuer: "camly".to_string(),
            signing_key: SigningKey::hmac(secret),
            token_lifespans: TokenLifespans::default(),
            action_lifespans: ActionTokenLifespans::default(),
            redis_url: None,
            revocation_purge_interval: Duration::from_secs(60),
            user_cache_capacity: 1024,
            log_format: LogFormat::Json,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if variables are invalid or key material cannot be
    /// read.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();

        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "camly".to_string());
        let jwt_algorithm = JwtAlgorithm::from_str(
            &env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
        )?;
        let signing_key = parse_signing_key(jwt_algorithm)?;

        let token_lifespans = TokenLifespans {
            access: Duration::from_secs(parse_env("ACCESS_TOKEN_LIFESPAN", 900)?),
            refresh: Duration::from_secs(parse_env("REFRESH_TOKEN_LIFESPAN", 3600)?),
        };
        let action_lifespans = ActionTokenLifespans {
            email_verification: Duration::from_secs(parse_env(
                "EMAIL_VERIFICATION_TOKEN_LIFESPAN",
                21600,
            )?),
            password_reset: Duration::from_secs(parse_env("PASSWORD_RESET_TOKEN_LIFESPAN", 3600)?),
        };

        let redis_url = env::var("REDIS_URL").ok().filter(|url| !url.is_empty());
        let revocation_purge_interval =
            Duration::from_secs(parse_env("REVOCATION_PURGE_INTERVAL", 60)?);
        let user_cache_capacity = parse_env("USER_CACHE_CAPACITY", 1024)?;
        let log_format = LogFormat::from_str(
            &env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        )?;

        let config = Self {
            jwt_issuer,
            signing_key,
            token_lifespans,
            action_lifespans,
            redis_url,
            revocation_purge_interval,
            user_cache_capacity,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `Config` naming the first offending setting.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.jwt_issuer.is_empty() {
            return Err(TokenError::config("JWT_ISSUER must not be empty"));
        }
        let lifespans = [
            ("ACCESS_TOKEN_LIFESPAN", self.token_lifespans.access),
            ("REFRESH_TOKEN_LIFESPAN", self.token_lifespans.refresh),
            ("EMAIL_VERIFICATION_TOKEN_LIFESPAN", self.action_lifespans.email_verification),
            ("PASSWORD_RESET_TOKEN_LIFESPAN", self.action_lifespans.password_reset),
        ];
        for (name, lifespan) in lifespans {
            if lifespan.is_zero() {
                return Err(TokenError::config(format!("{} must be greater than 0", name)));
            }
        }
        if self.revocation_purge_interval.is_zero() {
            return Err(TokenError::config(
                "REVOCATION_PURGE_INTERVAL must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TokenError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

/// Read signing key material for the configured algorithm.
fn parse_signing_key(algorithm: JwtAlgorithm) -> Result<SigningKey, TokenError> {
    if !algorithm.is_hmac() {
        let private_path = env::var("JWT_PRIVATE_KEY_PATH")
            .map_err(|_| TokenError::config("JWT_PRIVATE_KEY_PATH is required for RS256"))?;
        let public_path = env::var("JWT_PUBLIC_KEY_PATH")
            .map_err(|_| TokenError::config("JWT_PUBLIC_KEY_PATH is required for RS256"))?;

        let private_pem = std::fs::read(&private_path)
            .map_err(|e| TokenError::config(format!("Cannot read {}: {}", private_path, e)))?;
        let public_pem = std::fs::read(&public_path)
            .map_err(|e| TokenError::config(format!("Cannot read {}: {}", public_path, e)))?;

        return Ok(SigningKey::rsa(private_pem, public_pem));
    }

    let secret = match env::var("JWT_SECRET") {
        Ok(encoded) => base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &encoded)
            .map_err(|e| TokenError::config(format!("Invalid JWT_SECRET: {}", e)))?,
        Err(_) => {
            // Generate random key for development
            use rand::RngCore;
            warn!("JWT_SECRET not set, generating an ephemeral signing secret");
            let mut key = vec![0u8; 64];
            rand::thread_rng().fill_bytes(&mut key);
            key
        }
    };

    Ok(SigningKey::Hmac {
        algorithm,
        secret: SecretBytes::new(secret),
    })
}
