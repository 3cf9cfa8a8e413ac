use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

/// A cached access credential with its expiry instant.
#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// A process-local, time-expiring store of access credentials keyed by
/// account id. One entry per account; the last write wins.
///
/// Explicitly constructed and injected through the session manager, so tests
/// never share hidden state. Uses `tokio::time::Instant` so expiry can be
/// driven by the paused test clock.
#[derive(Clone)]
pub struct AccessTokenCache {
    cache: Arc<RwLock<HashMap<Uuid, CachedToken>>>,
    ttl: Duration,
}

impl AccessTokenCache {
    /// Creates a new cache whose entries live for `ttl` after each put.
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Stores an access credential for an account, replacing any prior entry.
    pub async fn put(&self, account_id: Uuid, token: String) {
        let mut cache = self.cache.write().await;
        cache.insert(
            account_id,
            CachedToken {
                token,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Gets the cached access credential for an account.
    ///
    /// Returns `None` on absence or expiry; an expired entry is dropped.
    pub async fn get(&self, account_id: Uuid) -> Option<String> {
        {
            let cache = self.cache.read().await;
            match cache.get(&account_id) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.token.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but has expired; evict it.
        let mut cache = self.cache.write().await;
        if let Some(entry) = cache.get(&account_id) {
            if entry.expires_at <= Instant::now() {
                cache.remove(&account_id);
            }
        }
        None
    }

    /// Removes an account's entry, used on logout.
    pub async fn remove(&self, account_id: Uuid) {
        let mut cache = self.cache.write().await;
        cache.remove(&account_id);
    }
}
