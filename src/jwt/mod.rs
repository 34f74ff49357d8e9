//! Signed access and refresh credentials.

/// Claim set construction.
pub mod builder;
/// Wire claims and credential types.
pub mod claims;
pub mod codec;
/// Credential and pair issuance.
pub mod issuer;
/// Authenticated caller identity.
pub mod principal;
/// Decode, type and revocation checks.
pub mod verifier;

pub use builder::ClaimsBuilder;
pub use claims::{Claims, TokenType};
pub use codec::SignedTokenCodec;
pub use issuer::{IssuedPair, IssuedToken, Subject, TokenIssuer, TokenLifespans, TokenPair};
pub use principal::Principal;
pub use verifier::CredentialVerifier;
