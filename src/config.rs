use anyhow::{Context, Result};
use std::env;
use zeroize::{Zeroize, Zeroizing};

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The Google OAuth client id the identity assertion must be issued for.
    pub google_client_id: String,
    /// The secret used to sign access credentials.
    pub access_secret: Zeroizing<String>,
    /// The secret used to sign refresh credentials.
    pub refresh_secret: Zeroizing<String>,
    /// The AES-256 key used to encrypt the session cookie.
    pub cookie_key: Zeroizing<Vec<u8>>,
    /// The lifetime of an access credential in seconds.
    pub access_token_life_secs: u64,
    /// The lifetime of a refresh credential in seconds.
    pub refresh_token_life_secs: u64,
    /// The max-age of the session cookie in seconds.
    pub cookie_life_secs: u64,
    /// The timeout for calls to the external identity verifier, in seconds.
    pub verifier_timeout_secs: u64,
    /// The origin of the web application, for CORS.
    pub web_app_origin: String,
    /// The port the HTTP server listens on.
    pub http_port: u16,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut cookie_key_hex = env::var("COOKIE_SECRET")
            .context("COOKIE_SECRET must be set (generate with: openssl rand -hex 32)")?;

        let cookie_key_bytes =
            hex::decode(&cookie_key_hex).context("COOKIE_SECRET must be valid hexadecimal")?;

        cookie_key_hex.zeroize();

        if cookie_key_bytes.len() != 32 {
            anyhow::bail!("COOKIE_SECRET must be exactly 32 bytes (64 hex characters)");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID must be set")?,
            access_secret: Zeroizing::new(
                env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            ),
            refresh_secret: Zeroizing::new(
                env::var("REFRESH_SECRET").context("REFRESH_SECRET must be set")?,
            ),
            cookie_key: Zeroizing::new(cookie_key_bytes),
            access_token_life_secs: env::var("ACCESS_LIFE")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .context("Invalid ACCESS_LIFE")?,
            refresh_token_life_secs: env::var("REFRESH_LIFE")
                .unwrap_or_else(|_| "604800".to_string())
                .parse()
                .context("Invalid REFRESH_LIFE")?,
            cookie_life_secs: env::var("COOKIE_LIFE")
                .unwrap_or_else(|_| "604800".to_string())
                .parse()
                .context("Invalid COOKIE_LIFE")?,
            verifier_timeout_secs: env::var("VERIFIER_TIMEOUT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid VERIFIER_TIMEOUT")?,
            web_app_origin: env::var("WEB_APP_SITE")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
        })
    }
}
