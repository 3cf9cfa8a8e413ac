use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use uuid::Uuid;

use crate::crypto::aes;
use crate::error::{AppError, Result};

/// The name of the session cookie.
pub const SESSION_COOKIE: &str = "bc.session";

/// The size of the session nonce in bytes (hex-encoded to 64 characters).
const SESSION_NONCE_SIZE: usize = 32;

/// The delimiter between the account id and the nonce inside the cookie
/// plaintext. It cannot occur in a UUID or in a hex-encoded nonce.
const DELIMITER: char = '|';

/// The outcome of decoding a session cookie.
///
/// Decoding is total: tampered, truncated, or otherwise malformed input
/// yields `Invalid` with a reason for the server logs. An invalid cookie
/// is equivalent to "no session", never a server error.
#[derive(Debug)]
pub enum CookieStatus {
    /// The cookie decrypted and parsed cleanly.
    Valid {
        /// The account the session belongs to.
        account_id: Uuid,
        /// The session nonce bound to the login that set the cookie.
        nonce: String,
    },
    /// The cookie could not be used; the reason is for logging only.
    Invalid(String),
}

/// Generates a new high-entropy session nonce, hex-encoded.
pub fn generate_session_nonce() -> String {
    let mut bytes = [0u8; SESSION_NONCE_SIZE];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Encodes `(account_id, nonce)` into the encrypted session cookie value.
///
/// # Arguments
///
/// * `key` - The server-held cookie encryption key.
/// * `account_id` - The account the session belongs to.
/// * `nonce` - The session nonce generated at login.
///
/// # Returns
///
/// A base64 blob of `aes_nonce || ciphertext`.
pub fn encode(key: &[u8; aes::KEY_SIZE], account_id: &str, nonce: &str) -> Result<String> {
    if account_id.is_empty() || nonce.is_empty() {
        return Err(AppError::Internal(
            "information missing for session cookie".to_string(),
        ));
    }

    let plaintext = format!("{}{}{}", account_id, DELIMITER, nonce);
    let sealed = aes::encrypt(key, plaintext.as_bytes())?;
    Ok(general_purpose::STANDARD.encode(sealed))
}

/// Decodes an encrypted session cookie value back into `(account_id, nonce)`.
///
/// # Arguments
///
/// * `key` - The server-held cookie encryption key.
/// * `blob` - The cookie value as received from the client.
pub fn decode(key: &[u8; aes::KEY_SIZE], blob: &str) -> CookieStatus {
    let sealed = match general_purpose::STANDARD.decode(blob) {
        Ok(bytes) => bytes,
        Err(e) => return CookieStatus::Invalid(format!("cookie is not valid base64: {}", e)),
    };

    let plaintext = match aes::decrypt(key, &sealed) {
        Ok(bytes) => bytes,
        Err(e) => return CookieStatus::Invalid(format!("cookie decryption failed: {}", e)),
    };

    let plaintext = match String::from_utf8(plaintext) {
        Ok(s) => s,
        Err(_) => return CookieStatus::Invalid("cookie plaintext is not UTF-8".to_string()),
    };

    let Some((account_id, nonce)) = plaintext.split_once(DELIMITER) else {
        return CookieStatus::Invalid("cookie plaintext has no delimiter".to_string());
    };

    if nonce.is_empty() {
        return CookieStatus::Invalid("cookie carries an empty nonce".to_string());
    }

    match Uuid::parse_str(account_id) {
        Ok(account_id) => CookieStatus::Valid {
            account_id,
            nonce: nonce.to_string(),
        },
        Err(_) => CookieStatus::Invalid("cookie carries a malformed account id".to_string()),
    }
}
