//! Account flows built on action tokens: email verification and password
//! reset.

use crate::action::{
    build_action_link, format_lifespan, ActionMail, ActionPurpose, ActionTokenService, Mailer,
};
use crate::error::TokenError;
use crate::user::PasswordHasher;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Email an action link for one of these flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Confirm ownership of the account email
    VerifyEmail,
    /// Choose a new password
    ResetPassword,
}

impl ActionKind {
    /// Token purpose backing this flow.
    #[must_use]
    pub const fn purpose(&self) -> ActionPurpose {
        match self {
            Self::VerifyEmail => ActionPurpose::EmailVerification,
            Self::ResetPassword => ActionPurpose::PasswordReset,
        }
    }

    /// Email subject line.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        match self {
            Self::VerifyEmail => "Verify your email",
            Self::ResetPassword => "Reset your password",
        }
    }
}

/// Sends action emails and completes the flows they start.
pub struct AccountActions {
    tokens: Arc<ActionTokenService>,
    hasher: Arc<dyn PasswordHasher>,
    mailer: Arc<dyn Mailer>,
}

impl AccountActions {
    /// Create the flows over an action token service.
    pub fn new(
        tokens: Arc<ActionTokenService>,
        hasher: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        AccountActions {
            tokens,
            hasher,
            mailer,
        }
    }

    /// Issue a token for `kind` and mail a link carrying it.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if no account has `email`
    /// - `Conflict` when asking to verify an already verified email
    pub async fn send_action_email(
        &self,
        email: &str,
        kind: ActionKind,
        url: &str,
    ) -> Result<(), TokenError> {
        let user = self
            .tokens
            .users()
            .find_by_email(email)
            .await?
            .ok_or(TokenError::UserNotFound)?;

        if kind == ActionKind::VerifyEmail && user.email_verified {
            return Err(TokenError::Conflict("Email already verified".to_string()));
        }

        let purpose = kind.purpose();
        let lifespan = self.tokens.lifespans().for_purpose(purpose);
        let grant = self.tokens.issue_to_user(user, purpose, lifespan).await?;

        let mail = ActionMail {
            to: email.to_string(),
            subject: kind.subject().to_string(),
            purpose,
            link: build_action_link(url, &grant.value),
            expires_in: format_lifespan(grant.lifespan),
        };
        self.mailer.send(mail).await?;

        info!(user_id = %grant.user_id, purpose = %purpose, "Sent action email");
        Ok(())
    }

    /// Mark the email of the token's owner as verified.
    pub async fn verify_email(&self, token: &str) -> Result<Uuid, TokenError> {
        self.tokens
            .redeem_with(token, ActionPurpose::EmailVerification, |user| {
                user.email_verified = true;
                Ok(())
            })
            .await
    }

    /// Replace the password of the token's owner.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Uuid, TokenError> {
        let hasher = self.hasher.clone();
        self.tokens
            .redeem_with(token, ActionPurpose::PasswordReset, move |user| {
                user.password_hash = Some(hasher.hash(new_password)?);
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionTokenLifespans, ActionTokenService};
    use crate::clock::ManualClock;
    use crate::user::{InMemoryUserStore, User, UserStore};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<ActionMail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: ActionMail) -> Result<(), TokenError> {
            self.sent.lock().await.push(mail);
            Ok(())
        }
    }

    struct ReverseHasher;

    impl PasswordHasher for ReverseHasher {
        fn hash(&self, raw: &str) -> Result<String, TokenError> {
            if raw.len() < 8 {
                return Err(TokenError::BadRequest("Password too short".to_string()));
            }
            Ok(raw.chars().rev().collect())
        }
    }

    struct Fixture {
        users: Arc<InMemoryUserStore>,
        mailer: Arc<RecordingMailer>,
        actions: AccountActions,
        user: User,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let users = Arc::new(InMemoryUserStore::new());
        let user = User::new("ines", "ines@camly.dev");
        users.save(&user).await.unwrap();

        let tokens = Arc::new(ActionTokenService::new(
            users.clone(),
            clock,
            ActionTokenLifespans::default(),
        ));
        let mailer = Arc::new(RecordingMailer::default());
        let actions = AccountActions::new(tokens, Arc::new(ReverseHasher), mailer.clone());
        Fixture {
            users,
            mailer,
            actions,
            user,
        }
    }

    fn token_from(link: &str) -> String {
        link.rsplit("token=").next().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_verify_email_flow() {
        let f = fixture().await;
        f.actions
            .send_action_email("ines@camly.dev", ActionKind::VerifyEmail, "https://camly.dev/verify")
            .await
            .unwrap();

        let mail = f.mailer.sent.lock().await.pop().unwrap();
        assert_eq!(mail.subject, "Verify your email");
        assert_eq!(mail.expires_in, "6 hours");
        assert!(mail.link.starts_with("https://camly.dev/verify?token="));

        let id = f.actions.verify_email(&token_from(&mail.link)).await.unwrap();
        assert_eq!(id, f.user.id);
        assert!(f.users.find_by_id(id).await.unwrap().unwrap().email_verified);
    }

    #[tokio::test]
    async fn test_verified_email_conflicts() {
        let f = fixture().await;
        let mut verified = f.user.clone();
        verified.email_verified = true;
        f.users.save(&verified).await.unwrap();

        let err = f
            .actions
            .send_action_email("ines@camly.dev", ActionKind::VerifyEmail, "https://camly.dev")
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::Conflict(_)));
        assert!(f.mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_email() {
        let f = fixture().await;
        let err = f
            .actions
            .send_action_email("nobody@camly.dev", ActionKind::ResetPassword, "https://camly.dev")
            .await
            .unwrap_err();
        assert!(matches!(err, TokenError::UserNotFound));
    }

    #[tokio::test]
    async fn test_reset_password_rejected_hash_keeps_token() {
        let f = fixture().await;
        f.actions
            .send_action_email(
                "ines@camly.dev",
                ActionKind::ResetPassword,
                "https://camly.dev/reset?lang=pt",
            )
            .await
            .unwrap();
        let mail = f.mailer.sent.lock().await.pop().unwrap();
        assert_eq!(mail.expires_in, "1 hour");
        assert!(mail.link.contains("?lang=pt&token="));
        let token = token_from(&mail.link);

        let err = f.actions.reset_password(&token, "short").await.unwrap_err();
        assert!(matches!(err, TokenError::BadRequest(_)));

        let id = f.actions.reset_password(&token, "long-enough").await.unwrap();
        let stored = f.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash.as_deref(), Some("hguone-gnol"));

        let err = f.actions.reset_password(&token, "long-enough").await.unwrap_err();
        assert!(matches!(err, TokenError::ActionTokenNotFound));
    }
}
