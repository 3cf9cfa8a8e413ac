use serde::Deserialize;
use std::time::Duration;

use crate::error::{AppError, Result};

/// A verified `(subjectId, name, email)` triple from the external identity
/// provider.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub subject_id: String,
    pub name: String,
    pub email: String,
}

/// Validates third-party identity assertions.
///
/// `Ok(None)` means the assertion is bad or expired (the caller answers 401);
/// `Err` is reserved for transport failures talking to the provider.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait IdentityVerifier: Clone + Send + Sync + 'static {
    fn verify(
        &self,
        assertion: &str,
    ) -> impl std::future::Future<Output = Result<Option<VerifiedIdentity>>> + Send;
}

/// The shape of Google's tokeninfo response we care about.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: String,
    #[serde(default)]
    name: String,
}

/// Verifies Google ID tokens against the tokeninfo endpoint.
#[derive(Clone)]
pub struct GoogleIdentityVerifier {
    client: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleIdentityVerifier {
    const TOKENINFO_URL: &'static str = "https://oauth2.googleapis.com/tokeninfo";

    /// Creates a verifier for the given OAuth client id.
    ///
    /// All calls to the provider are bounded by `timeout`.
    pub fn new(client_id: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id,
            endpoint: Self::TOKENINFO_URL.to_string(),
        })
    }
}

impl IdentityVerifier for GoogleIdentityVerifier {
    async fn verify(&self, assertion: &str) -> Result<Option<VerifiedIdentity>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Identity provider unreachable: {}", e)))?;

        // Tokeninfo answers 4xx for bad or expired assertions.
        if response.status().is_client_error() {
            tracing::debug!("Identity assertion rejected by provider: {}", response.status());
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "Identity provider error: {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Malformed tokeninfo response: {}", e)))?;

        if info.aud != self.client_id {
            tracing::warn!("Identity assertion issued for a different client");
            return Ok(None);
        }

        Ok(Some(VerifiedIdentity {
            subject_id: info.sub,
            name: info.name,
            email: info.email,
        }))
    }
}
