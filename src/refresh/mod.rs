//! Refresh credential rotation.

/// Single-use exchange of refresh credentials.
pub mod rotator;

pub use rotator::RefreshRotator;
