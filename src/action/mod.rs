//! Single-use action tokens for email verification and password reset.

/// Random token values.
pub mod generator;
/// Action emails and link building.
pub mod mail;
/// Token purposes.
pub mod purpose;
/// Issuance and redemption.
pub mod service;

pub use generator::SecureTokenGenerator;
pub use mail::{build_action_link, format_lifespan, ActionMail, Mailer};
pub use purpose::ActionPurpose;
pub use service::{ActionTokenGrant, ActionTokenLifespans, ActionTokenService};
