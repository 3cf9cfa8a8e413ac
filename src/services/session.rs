use uuid::Uuid;

use crate::crypto::cookie;
use crate::error::{AppError, Result};
use crate::models::account::{Account, NewAccount};
use crate::repositories::account::AccountStore;
use crate::services::identity::IdentityVerifier;
use crate::tokens::cache::AccessTokenCache;
use crate::tokens::credential::{self, TokenPayload, TokenStatus};

/// The signing secrets and lifetimes the session manager mints tokens with.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_life_secs: u64,
    pub refresh_life_secs: u64,
}

/// A freshly established session: the account plus the nonce the caller must
/// encode into the session cookie.
#[derive(Debug)]
pub struct EstablishedSession {
    pub account: Account,
    pub nonce: String,
}

/// Orchestrates login, logout, and refresh: issues session nonces, mints and
/// validates both credential kinds, and keeps the access-token cache and the
/// account store in step.
#[derive(Clone)]
pub struct SessionManager<S, V> {
    store: S,
    verifier: V,
    cache: AccessTokenCache,
    tokens: TokenConfig,
}

impl<S: AccountStore, V: IdentityVerifier> SessionManager<S, V> {
    /// Creates a new session manager.
    pub fn new(store: S, verifier: V, cache: AccessTokenCache, tokens: TokenConfig) -> Self {
        Self {
            store,
            verifier,
            cache,
            tokens,
        }
    }

    /// The access-token cache, for the authentication gate's fast path.
    pub fn cache(&self) -> &AccessTokenCache {
        &self.cache
    }

    /// The secret access credentials are verified with.
    pub fn access_secret(&self) -> &str {
        &self.tokens.access_secret
    }

    /// The account store, for status checks layered after authentication.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Establishes a session from an external identity assertion.
    ///
    /// Verifies the assertion, resolves or creates the account, rotates the
    /// refresh credential with a fresh session nonce, and caches a new access
    /// credential. The refresh credential is durably persisted before this
    /// returns, so the caller may only set the cookie afterwards.
    pub async fn login(&self, assertion: &str) -> Result<EstablishedSession> {
        let identity = self
            .verifier
            .verify(assertion)
            .await?
            .ok_or_else(|| {
                AppError::IdentityVerification("assertion rejected by provider".to_string())
            })?;

        let account = match self.store.find_by_subject_id(&identity.subject_id).await? {
            Some(account) => account,
            None => {
                let account = self
                    .store
                    .create(NewAccount {
                        subject_id: identity.subject_id.clone(),
                        name: identity.name.clone(),
                        email: identity.email.clone(),
                    })
                    .await?;
                tracing::info!("Created account {} for new subject", account.id);
                account
            }
        };

        let nonce = cookie::generate_session_nonce();

        // One refresh credential per account: this overwrite is what
        // invalidates any prior login's cookie.
        let refresh_token = credential::issue(
            &TokenPayload::for_account(&account, Some(&nonce)),
            &self.tokens.refresh_secret,
            self.tokens.refresh_life_secs,
        )?;
        self.store
            .set_refresh_token(account.id, Some(&refresh_token))
            .await?;

        let access_token = credential::issue(
            &TokenPayload::for_account(&account, None),
            &self.tokens.access_secret,
            self.tokens.access_life_secs,
        )?;
        self.cache.put(account.id, access_token).await;

        tracing::info!("Session established for account {}", account.id);

        Ok(EstablishedSession { account, nonce })
    }

    /// Mints a fresh access credential for an account, gated by the nonce
    /// check against the persisted refresh credential.
    ///
    /// Returns `Ok(None)` when the refresh is denied: unknown account, no or
    /// invalid refresh credential, or a nonce from a superseded login. Store
    /// failures surface as errors.
    pub async fn refresh(&self, account_id: Uuid, nonce: &str) -> Result<Option<String>> {
        let Some(account) = self.store.find_by_id(account_id).await? else {
            tracing::warn!("Refresh denied: unknown account {}", account_id);
            return Ok(None);
        };

        let Some(refresh_token) = account.refresh_token.as_deref().filter(|t| !t.is_empty())
        else {
            tracing::warn!("Refresh denied: account {} has no refresh credential", account_id);
            return Ok(None);
        };

        let claims = match credential::verify(refresh_token, &self.tokens.refresh_secret) {
            TokenStatus::Valid(claims) => claims,
            TokenStatus::Invalid(reason) => {
                tracing::warn!("Refresh denied for account {}: {}", account_id, reason);
                return Ok(None);
            }
        };

        // Anti-replay: a cookie from a superseded login carries a nonce that
        // no longer matches the current refresh credential.
        if claims.payload.key != nonce {
            tracing::warn!(
                "Refresh denied for account {}: session nonce does not match current login",
                account_id
            );
            return Ok(None);
        }

        let access_token = credential::issue(
            &TokenPayload::for_account(&account, None),
            &self.tokens.access_secret,
            self.tokens.access_life_secs,
        )?;
        self.cache.put(account_id, access_token.clone()).await;

        tracing::debug!("Access credential refreshed for account {}", account_id);
        Ok(Some(access_token))
    }

    /// Tears a session down: clears the persisted refresh credential and the
    /// cached access credential. Idempotent.
    pub async fn logout(&self, account_id: Uuid) -> Result<()> {
        match self.store.set_refresh_token(account_id, None).await {
            Ok(()) | Err(AppError::NotFound) => {}
            Err(e) => return Err(e),
        }
        self.cache.remove(account_id).await;

        tracing::info!("Session cleared for account {}", account_id);
        Ok(())
    }
}
