use crate::action::purpose::ActionPurpose;
use crate::error::TokenError;
use async_trait::async_trait;
use std::time::Duration;

/// A rendered action email, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Purpose of the carried token
    pub purpose: ActionPurpose,
    /// Link carrying the token as a `token` query parameter
    pub link: String,
    /// Human readable lifespan, e.g. "1 hour and 30 minutes"
    pub expires_in: String,
}

/// Email delivery, provided by the embedding application.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `mail`.
    async fn send(&self, mail: ActionMail) -> Result<(), TokenError>;
}

/// Append `token=<value>` to `url`, respecting an existing query string.
pub fn build_action_link(url: &str, token: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", url, separator, token)
}

/// Render a lifespan as hours and minutes.
pub fn format_lifespan(lifespan: Duration) -> String {
    let total_minutes = lifespan.as_secs() / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours == 0 {
        return plural(total_minutes, "minute");
    }

    let hour_text = plural(hours, "hour");
    if minutes > 0 {
        format!("{} and {}", hour_text, plural(minutes, "minute"))
    } else {
        hour_text
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
