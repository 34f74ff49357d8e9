//! Wiring of the auth core from configuration.

use crate::account::AccountActions;
use crate::action::{ActionTokenService, Mailer};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::TokenError;
use crate::gate::TypeGateLayer;
use crate::jwt::{CredentialVerifier, SignedTokenCodec, TokenIssuer};
use crate::revocation::{InMemoryRevocationStore, RedisRevocationStore, RevocationStore};
use crate::service::TokenService;
use crate::user::{CachedUserStore, PasswordHasher, UserStore};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared services built once at startup.
pub struct AuthContext {
    config: Config,
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    actions: Arc<ActionTokenService>,
    purge_task: Option<JoinHandle<()>>,
}

impl AuthContext {
    /// Build every service from `config`.
    ///
    /// Uses Redis for revocations when `redis_url` is set, otherwise an
    /// in-memory list purged in the background. `users` is wrapped in a
    /// read-through cache unless `user_cache_capacity` is 0.
    ///
    /// # Errors
    ///
    /// `Config` or `Signer` for unusable settings or key material, `Storage`
    /// if Redis cannot be reached.
    pub async fn from_config(
        config: Config,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        config.validate()?;

        let codec = Arc::new(SignedTokenCodec::new(
            &config.signing_key,
            config.jwt_issuer.clone(),
            clock.clone(),
        )?);

        let mut purge_task = None;
        let revocations: Arc<dyn RevocationStore> = match &config.redis_url {
            Some(url) => Arc::new(RedisRevocationStore::connect(url, clock.clone()).await?),
            None => {
                let store = Arc::new(InMemoryRevocationStore::new(clock.clone()));
                purge_task = Some(store.spawn_purge_task(config.revocation_purge_interval));
                store
            }
        };

        let users: Arc<dyn UserStore> = match NonZeroUsize::new(config.user_cache_capacity) {
            Some(capacity) => Arc::new(CachedUserStore::new(users, capacity)),
            None => users,
        };

        let issuer = Arc::new(TokenIssuer::new(codec.clone(), config.token_lifespans));
        let verifier = CredentialVerifier::new(codec, revocations);
        let tokens = Arc::new(TokenService::new(issuer, verifier, users.clone()));
        let actions = Arc::new(ActionTokenService::new(
            users.clone(),
            clock,
            config.action_lifespans,
        ));

        info!(
            issuer = %config.jwt_issuer,
            algorithm = config.signing_key.algorithm().as_str(),
            redis = config.redis_url.is_some(),
            "Auth core initialized"
        );

        Ok(Self {
            config,
            users,
            tokens,
            actions,
            purge_task,
        })
    }

    /// Validated configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// User store, cached when configured.
    #[must_use]
    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    /// Credential service.
    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Action token service.
    #[must_use]
    pub fn actions(&self) -> &Arc<ActionTokenService> {
        &self.actions
    }

    /// Tower layer enforcing access credentials on wrapped routes.
    #[must_use]
    pub fn type_gate_layer(&self) -> TypeGateLayer {
        TypeGateLayer::new(self.tokens.clone())
    }

    /// Account flows using the application's hasher and mailer.
    pub fn account_actions(
        &self,
        hasher: Arc<dyn PasswordHasher>,
        mailer: Arc<dyn Mailer>,
    ) -> AccountActions {
        AccountActions::new(self.actions.clone(), hasher, mailer)
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        if let Some(task) = self.purge_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::user::{InMemoryUserStore, User};

    #[tokio::test]
    async fn test_from_config_in_memory() {
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let users = Arc::new(InMemoryUserStore::new());
        let user = User::new("ari", "ari@camly.dev");
        users.save(&user).await.unwrap();

        let context = AuthContext::from_config(Config::with_secret(vec![9u8; 32]), users, clock)
            .await
            .unwrap();

        let pair = context.tokens().issue_for(&user).unwrap();
        assert_eq!(pair.expires_in, 900);

        let principal = context.tokens().authenticate(&pair.access_token).await.unwrap();
        assert_eq!(principal.user_id, user.id);
        assert!(context.users().find_by_id(user.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_from_config_rejects_short_secret() {
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let result = AuthContext::from_config(
            Config::with_secret(vec![1u8; 8]),
            Arc::new(InMemoryUserStore::new()),
            clock,
        )
        .await;

        assert!(matches!(result, Err(TokenError::Config(_))));
    }
}
