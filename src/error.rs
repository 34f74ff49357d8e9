//! Error taxonomy shared by credential and action-token flows.
//!
//! Every failure maps to exactly one variant. Callers turn a variant into a
//! response through [`TokenError::status`] and [`ErrorResponse`], which never
//! leaks signer or storage details.

use crate::jwt::TokenType;
use http::StatusCode;
use thiserror::Error;

/// Errors produced by the auth core.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TokenError {
    /// Malformed, badly signed, wrongly issued or expired credential
    #[error("Credential invalid")]
    InvalidCredential,

    /// Credential id is on the revocation list
    #[error("Credential revoked")]
    CredentialRevoked,

    /// Structurally valid credential presented in the wrong slot
    #[error("Wrong credential type: expected {expected}, found {found}")]
    WrongCredentialType {
        /// Type the caller required
        expected: TokenType,
        /// Type declared by the credential
        found: TokenType,
    },

    /// Action token value matches no live token
    #[error("Action token not found")]
    ActionTokenNotFound,

    /// Action token exists but is past its expiry
    #[error("Action token expired")]
    ActionTokenExpired,

    /// No user record for the given id or email
    #[error("User not found")]
    UserNotFound,

    /// Request conflicts with current user state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request rejected by business validation
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Signing key material unusable
    #[error("Signer error: {0}")]
    Signer(String),

    /// Configuration invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Revocation or user store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Signer error.
    pub fn signer(msg: impl Into<String>) -> Self {
        Self::Signer(msg.into())
    }

    /// Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCredential => ErrorCode::CredentialInvalid,
            Self::CredentialRevoked => ErrorCode::CredentialRevoked,
            Self::WrongCredentialType { .. } => ErrorCode::CredentialWrongType,
            Self::ActionTokenNotFound => ErrorCode::ActionTokenNotFound,
            Self::ActionTokenExpired => ErrorCode::ActionTokenExpired,
            Self::UserNotFound => ErrorCode::UserNotFound,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::BadRequest(_) => ErrorCode::BadRequest,
            Self::Signer(_) | Self::Config(_) | Self::Internal(_) => ErrorCode::Internal,
            Self::Storage(_) => ErrorCode::StorageUnavailable,
        }
    }

    /// HTTP status for this error.
    ///
    /// `WrongCredentialType` is a bad request here because the refresh
    /// endpoint is the only caller that surfaces it; the type gate answers
    /// 401 on its own.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.code().status()
    }

    /// Whether the failure is a rejected credential rather than a fault.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::InvalidCredential | Self::CredentialRevoked)
    }
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Credential failed decoding or has expired
    CredentialInvalid,
    /// Credential id is on the revocation list
    CredentialRevoked,
    /// Access used where refresh is required, or the reverse
    CredentialWrongType,
    /// No live action token has the value
    ActionTokenNotFound,
    /// Action token is past its expiry
    ActionTokenExpired,
    /// Account does not exist
    UserNotFound,
    /// Request conflicts with account state
    Conflict,
    /// Malformed request
    BadRequest,
    /// Backing store failed
    StorageUnavailable,
    /// Anything else
    Internal,
}

impl ErrorCode {
    /// String form used in responses and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialInvalid => "CREDENTIAL_INVALID",
            Self::CredentialRevoked => "CREDENTIAL_REVOKED",
            Self::CredentialWrongType => "CREDENTIAL_WRONG_TYPE",
            Self::ActionTokenNotFound => "ACTION_TOKEN_NOT_FOUND",
            Self::ActionTokenExpired => "ACTION_TOKEN_EXPIRED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::BadRequest => "BAD_REQUEST",
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::CredentialInvalid | Self::CredentialRevoked => StatusCode::UNAUTHORIZED,
            Self::CredentialWrongType | Self::ActionTokenExpired | Self::BadRequest => {
                StatusCode::BAD_REQUEST
            }
            Self::ActionTokenNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Sanitized error body.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorResponse {
    /// HTTP status as a number
    pub status: u16,
    /// Stable error code
    pub code: &'static str,
    /// Human-readable message
    pub message: String,
}

impl ErrorResponse {
    /// Build a response body from an error.
    #[must_use]
    pub fn from_error(error: &TokenError) -> Self {
        let message = match error {
            // Signature, structure and expiry failures look the same to callers
            TokenError::InvalidCredential => "Invalid credential".to_string(),
            TokenError::CredentialRevoked => "Credential has been revoked".to_string(),
            TokenError::WrongCredentialType { expected, .. } => {
                format!("Expected {expected} token")
            }
            TokenError::ActionTokenNotFound => "Action token not found".to_string(),
            TokenError::ActionTokenExpired => "Action token expired".to_string(),
            TokenError::UserNotFound => "User not found".to_string(),
            TokenError::Conflict(msg) | TokenError::BadRequest(msg) => msg.clone(),
            TokenError::Storage(_) => "Service temporarily unavailable".to_string(),
            TokenError::Signer(_) | TokenError::Config(_) | TokenError::Internal(_) => {
                "Internal error".to_string()
            }
        };

        Self {
            status: error.status().as_u16(),
            code: error.code().as_str(),
            message,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::RsaFailedSigning
            | ErrorKind::Crypto(_) => TokenError::Signer(err.to_string()),
            _ => TokenError::InvalidCredential,
        }
    }
}

impl From<redis::RedisError> for TokenError {
    fn from(err: redis::RedisError) -> Self {
        TokenError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_are_unauthorized() {
        assert_eq!(TokenError::InvalidCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(TokenError::CredentialRevoked.status(), StatusCode::UNAUTHORIZED);
        assert!(TokenError::InvalidCredential.is_unauthorized());
        assert!(!TokenError::ActionTokenExpired.is_unauthorized());
    }

    #[test]
    fn test_wrong_type_is_bad_request() {
        let err = TokenError::WrongCredentialType {
            expected: TokenType::Refresh,
            found: TokenType::Access,
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code().as_str(), "CREDENTIAL_WRONG_TYPE");
        assert_eq!(ErrorResponse::from_error(&err).message, "Expected refresh token");
    }

    #[test]
    fn test_action_token_statuses() {
        assert_eq!(TokenError::ActionTokenNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(TokenError::ActionTokenExpired.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = TokenError::signer("RSA key at /etc/keys/private.pem unreadable");
        let body = ErrorResponse::from_error(&err);
        assert_eq!(body.status, 500);
        assert_eq!(body.message, "Internal error");

        let err = TokenError::storage("redis://10.0.0.3 refused");
        assert_eq!(ErrorResponse::from_error(&err).message, "Service temporarily unavailable");
    }

    #[test]
    fn test_jsonwebtoken_errors_map_to_invalid_credential() {
        let err: TokenError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidSignature)
                .into();
        assert!(matches!(err, TokenError::InvalidCredential));

        let err: TokenError =
            jsonwebtoken::errors::Error::from(jsonwebtoken::errors::ErrorKind::InvalidKeyFormat)
                .into();
        assert!(matches!(err, TokenError::Signer(_)));
    }

    #[test]
    fn test_error_response_json_shape() {
        let body = ErrorResponse::from_error(&TokenError::CredentialRevoked);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["status"], 401);
        assert_eq!(json["code"], "CREDENTIAL_REVOKED");
        assert_eq!(json["message"], "Credential has been revoked");
    }
}
