use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    /// The external identity assertion could not be verified.
    #[error("Identity verification failed: {0}")]
    IdentityVerification(String),

    /// The request carries no usable session credential.
    #[error("Authentication needed")]
    NeedAuthentication,

    /// The identity is valid but the account status forbids access.
    #[error("Not authorized")]
    NotAuthorized,

    /// A resource not found error.
    #[error("Resource not found")]
    NotFound,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An encryption or decryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes exposed to clients in the response body.
mod codes {
    pub const NOT_AUTHENTICATED: &str = "NotAuthenticated";
    pub const NEED_AUTHENTICATION: &str = "NeedAuthentication";
    pub const NOT_AUTHORIZED: &str = "NotAuthorized";
    pub const PROFILE_NOT_FOUND: &str = "ProfileNotFound";
    pub const VALIDATION: &str = "Validation";
    pub const DATA_STORE_ERROR: &str = "DataStoreError";
    pub const INTERNAL_ERROR: &str = "InternalError";
}

/// Builds the uniform error body: `{"errorCode", "message", "occurrence"}`.
pub fn error_body(error_code: &str, message: &str) -> String {
    sonic_rs::to_string(&sonic_rs::json!({
        "errorCode": error_code,
        "message": message,
        "occurrence": Utc::now().timestamp_millis(),
    }))
    .unwrap_or_else(|_| {
        r#"{"errorCode":"InternalError","message":"Internal server error"}"#.to_string()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Credential internals (token/cookie contents, mismatch reasons) must
        // never reach the client; they are logged where the failure occurred.
        let (status, code, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::DATA_STORE_ERROR,
                    "Internal error accessing the data store".to_string(),
                )
            }

            AppError::Pool(ref e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::DATA_STORE_ERROR,
                    "Internal error accessing the data store".to_string(),
                )
            }

            AppError::IdentityVerification(ref msg) => {
                tracing::warn!("Identity verification failed: {}", msg);
                (
                    StatusCode::UNAUTHORIZED,
                    codes::NOT_AUTHENTICATED,
                    "Token verification failed".to_string(),
                )
            }

            AppError::NeedAuthentication => {
                tracing::debug!("Access by unauthenticated user");
                (
                    StatusCode::UNAUTHORIZED,
                    codes::NEED_AUTHENTICATION,
                    "Unauthenticated: refresh or authentication necessary".to_string(),
                )
            }

            AppError::NotAuthorized => {
                tracing::warn!("Access by unauthorized account");
                (
                    StatusCode::FORBIDDEN,
                    codes::NOT_AUTHORIZED,
                    "This account is not authorized. Contact the administrator for assistance."
                        .to_string(),
                )
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (
                    StatusCode::NOT_FOUND,
                    codes::PROFILE_NOT_FOUND,
                    "Resource not found".to_string(),
                )
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, codes::VALIDATION, msg.clone())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL_ERROR,
                    "Internal server error".to_string(),
                )
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    codes::INTERNAL_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = error_body(code, &message);

        (
            status,
            [(http::header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response()
    }
}
