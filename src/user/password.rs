use crate::error::TokenError;

/// One-way password hashing, provided by the embedding application.
pub trait PasswordHasher: Send + Sync {
    /// Hash a raw password for storage.
    fn hash(&self, raw: &str) -> Result<String, TokenError>;
}
