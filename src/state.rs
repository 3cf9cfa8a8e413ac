use std::time::Duration;

use crate::config::Config;
use crate::crypto::aes;
use crate::error::{AppError, Result};
use crate::repositories::account::{AccountStore, PgAccountStore};
use crate::services::identity::{GoogleIdentityVerifier, IdentityVerifier};
use crate::services::session::{SessionManager, TokenConfig};
use crate::tokens::cache::AccessTokenCache;

/// The application's state.
///
/// Generic over the account store and identity verifier so tests can wire in
/// in-memory collaborators; production uses the Postgres store and the Google
/// verifier.
#[derive(Clone)]
pub struct AppState<S: AccountStore, V: IdentityVerifier> {
    /// The session manager.
    pub sessions: SessionManager<S, V>,
    /// The key the session cookie is encrypted with.
    cookie_key: [u8; aes::KEY_SIZE],
    /// The max-age of the session cookie, in seconds.
    pub cookie_life_secs: u64,
}

impl<S: AccountStore, V: IdentityVerifier> AppState<S, V> {
    /// Assembles a state from explicit parts.
    pub fn from_parts(
        sessions: SessionManager<S, V>,
        cookie_key: [u8; aes::KEY_SIZE],
        cookie_life_secs: u64,
    ) -> Self {
        Self {
            sessions,
            cookie_key,
            cookie_life_secs,
        }
    }

    /// The session-cookie encryption key.
    pub fn cookie_key(&self) -> &[u8; aes::KEY_SIZE] {
        &self.cookie_key
    }
}

impl AppState<PgAccountStore, GoogleIdentityVerifier> {
    /// Creates the production `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = crate::db::create_pool(&config.database_url)?;
        tracing::info!("PostgreSQL pool initialized");

        let store = PgAccountStore::new(pool);

        let verifier = GoogleIdentityVerifier::new(
            config.google_client_id.clone(),
            Duration::from_secs(config.verifier_timeout_secs),
        )?;
        tracing::info!("Identity verifier initialized");

        let cache = AccessTokenCache::new(Duration::from_secs(config.access_token_life_secs));
        tracing::info!("Access token cache initialized");

        let sessions = SessionManager::new(
            store,
            verifier,
            cache,
            TokenConfig {
                access_secret: config.access_secret.to_string(),
                refresh_secret: config.refresh_secret.to_string(),
                access_life_secs: config.access_token_life_secs,
                refresh_life_secs: config.refresh_token_life_secs,
            },
        );

        let cookie_key: [u8; aes::KEY_SIZE] = config
            .cookie_key
            .as_slice()
            .try_into()
            .map_err(|_| AppError::Encryption("Invalid cookie key size".to_string()))?;

        Ok(AppState {
            sessions,
            cookie_key,
            cookie_life_secs: config.cookie_life_secs,
        })
    }
}
