use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::account::Account;

/// The identity payload embedded in both credential kinds.
///
/// `key` carries the session nonce for refresh credentials and is empty for
/// access credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    /// The external-identity subject id.
    pub sub: String,
    /// The account's email address.
    pub email: String,
    /// The account's display name.
    pub name: String,
    /// The account id.
    pub account_id: Uuid,
    /// The session nonce, or empty for access credentials.
    #[serde(default)]
    pub key: String,
}

impl TokenPayload {
    /// Builds the payload for an account, optionally binding a session nonce.
    pub fn for_account(account: &Account, nonce: Option<&str>) -> Self {
        Self {
            sub: account.subject_id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            account_id: account.id,
            key: nonce.unwrap_or_default().to_string(),
        }
    }
}

/// The signed claim set: the identity payload plus the expiry claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// The outcome of verifying a credential.
///
/// Verification is total: expiry, a bad signature, and malformed input all
/// yield `Invalid` rather than an error. Callers treat `Invalid` as "no
/// credential"; the reason is for server logs only.
#[derive(Debug)]
pub enum TokenStatus {
    Valid(Claims),
    Invalid(String),
}

/// Issues a signed, time-bounded credential for the given payload.
///
/// # Arguments
///
/// * `payload` - The identity payload to sign.
/// * `secret` - The signing secret (access or refresh).
/// * `lifetime_secs` - Seconds until the credential expires.
///
/// # Returns
///
/// A `Result` containing the signed credential.
pub fn issue(payload: &TokenPayload, secret: &str, lifetime_secs: u64) -> Result<String> {
    if payload.sub.is_empty() || payload.email.is_empty() {
        return Err(AppError::Internal(
            "insufficient data to create credential".to_string(),
        ));
    }

    let claims = Claims {
        payload: payload.clone(),
        exp: Utc::now().timestamp() + lifetime_secs as i64,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to sign credential: {}", e)))
}

/// Verifies a credential's signature and expiry claim.
///
/// # Arguments
///
/// * `token` - The credential to verify.
/// * `secret` - The signing secret it must have been issued with.
pub fn verify(token: &str, secret: &str) -> TokenStatus {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => TokenStatus::Valid(data.claims),
        Err(e) => TokenStatus::Invalid(format!("credential verification failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountStatus;

    const SECRET: &str = "test-signing-secret";

    fn test_account() -> Account {
        Account {
            id: Uuid::new_v4(),
            subject_id: "subject-123".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            status: AccountStatus::Active,
            refresh_token: None,
            default_instructions: String::new(),
            default_tone: String::new(),
            default_model: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let account = test_account();
        let payload = TokenPayload::for_account(&account, Some("nonce-1"));
        let token = issue(&payload, SECRET, 3600).unwrap();

        match verify(&token, SECRET) {
            TokenStatus::Valid(claims) => {
                assert_eq!(claims.payload.sub, "subject-123");
                assert_eq!(claims.payload.account_id, account.id);
                assert_eq!(claims.payload.key, "nonce-1");
            }
            TokenStatus::Invalid(reason) => panic!("expected valid token: {}", reason),
        }
    }

    #[test]
    fn access_payload_has_empty_key() {
        let payload = TokenPayload::for_account(&test_account(), None);
        assert!(payload.key.is_empty());
    }

    #[test]
    fn issue_rejects_missing_identity_fields() {
        let mut payload = TokenPayload::for_account(&test_account(), None);
        payload.sub = String::new();
        assert!(issue(&payload, SECRET, 3600).is_err());

        let mut payload = TokenPayload::for_account(&test_account(), None);
        payload.email = String::new();
        assert!(issue(&payload, SECRET, 3600).is_err());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let payload = TokenPayload::for_account(&test_account(), None);
        let token = issue(&payload, SECRET, 3600).unwrap();
        assert!(matches!(
            verify(&token, "another-secret"),
            TokenStatus::Invalid(_)
        ));
    }

    #[test]
    fn verify_rejects_expired_credential() {
        let claims = Claims {
            payload: TokenPayload::for_account(&test_account(), None),
            exp: Utc::now().timestamp() - 120,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(verify(&token, SECRET), TokenStatus::Invalid(_)));
    }

    #[test]
    fn verify_rejects_malformed_input() {
        assert!(matches!(
            verify("definitely.not.a-jwt", SECRET),
            TokenStatus::Invalid(_)
        ));
        assert!(matches!(verify("", SECRET), TokenStatus::Invalid(_)));
    }
}
