//! Camly auth core.
//!
//! Provides signed access/refresh credential issuance and validation,
//! refresh rotation, jti revocation, a request type gate, and single-use
//! action tokens for email verification and password reset.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod account;
pub mod action;
pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod jwt;
pub mod metrics;
pub mod observability;
pub mod refresh;
pub mod revocation;
pub mod service;
pub mod user;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use context::AuthContext;
pub use error::TokenError;
pub use service::TokenService;
