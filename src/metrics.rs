//! Prometheus metrics for the auth core.
//!
//! Provides counters for credential and action-token lifecycle events.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Credentials issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "camly_auth_tokens_issued_total",
        "Total number of credentials issued",
        &["token_type", "algorithm"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Refresh rotations counter.
pub static TOKENS_REFRESHED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "camly_auth_tokens_refreshed_total",
        "Total number of refresh rotations",
        &["status"]
    )
    .expect("Failed to register tokens_refreshed metric")
});

/// Credentials revoked counter.
pub static TOKENS_REVOKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "camly_auth_tokens_revoked_total",
        "Total number of credentials revoked",
        &["reason"]
    )
    .expect("Failed to register tokens_revoked metric")
});

/// Action tokens counter.
pub static ACTION_TOKENS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "camly_auth_action_tokens_total",
        "Total number of action token events",
        &["purpose", "event"]
    )
    .expect("Failed to register action_tokens metric")
});

/// Type gate rejections counter.
pub static GATE_REJECTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "camly_auth_gate_rejections_total",
        "Total number of requests rejected by the type gate",
        &["code"]
    )
    .expect("Failed to register gate_rejections metric")
});

/// User cache operations counter.
pub static CACHE_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "camly_auth_user_cache_operations_total",
        "Total number of user cache lookups",
        &["operation", "status"]
    )
    .expect("Failed to register cache_operations metric")
});

/// Record a credential issuance.
pub fn record_token_issued(token_type: &str, algorithm: &str) {
    TOKENS_ISSUED
        .with_label_values(&[token_type, algorithm])
        .inc();
}

/// Record a refresh rotation outcome.
pub fn record_token_refreshed(status: &str) {
    TOKENS_REFRESHED.with_label_values(&[status]).inc();
}

/// Record a revocation.
pub fn record_token_revoked(reason: &str) {
    TOKENS_REVOKED.with_label_values(&[reason]).inc();
}

/// Record an action token event (`issued`, `redeemed`, `rejected`).
pub fn record_action_token(purpose: &str, event: &str) {
    ACTION_TOKENS.with_label_values(&[purpose, event]).inc();
}

/// Record a type gate rejection.
pub fn record_gate_rejection(code: &str) {
    GATE_REJECTIONS.with_label_values(&[code]).inc();
}

/// Record a user cache lookup.
pub fn record_cache_operation(operation: &str, status: &str) {
    CACHE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_issued() {
        record_token_issued("access", "HS256");
        let value = TOKENS_ISSUED
            .with_label_values(&["access", "HS256"])
            .get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_action_token() {
        record_action_token("password_reset", "redeemed");
        let value = ACTION_TOKENS
            .with_label_values(&["password_reset", "redeemed"])
            .get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_gate_rejection() {
        record_gate_rejection("CREDENTIAL_REVOKED");
        let value = GATE_REJECTIONS
            .with_label_values(&["CREDENTIAL_REVOKED"])
            .get();
        assert!(value > 0.0);
    }
}
