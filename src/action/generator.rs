use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

/// Random bytes behind every action token.
pub const TOKEN_BYTES: usize = 32;

/// Encoded length of a [`TOKEN_BYTES`] token.
pub const TOKEN_LENGTH: usize = 43;

/// Generator of action token values.
pub struct SecureTokenGenerator;

impl SecureTokenGenerator {
    /// 32 bytes from the thread-local CSPRNG, base64url without padding.
    pub fn generate() -> String {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; TOKEN_BYTES] = rng.gen();
        URL_SAFE_NO_PAD.encode(random_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique_tokens() {
        let token1 = SecureTokenGenerator::generate();
        let token2 = SecureTokenGenerator::generate();
        assert_ne!(token1, token2);
        assert_eq!(token1.len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_generate_url_safe_alphabet() {
        let token = SecureTokenGenerator::generate();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn test_no_collisions_in_batch() {
        let tokens: HashSet<String> = (0..1000).map(|_| SecureTokenGenerator::generate()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
