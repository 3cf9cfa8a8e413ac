use axum::{
    Extension,
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    crypto::cookie::{self, CookieStatus},
    error::{AppError, Result},
    models::account::AccountStatus,
    repositories::account::AccountStore,
    services::identity::IdentityVerifier,
    state::AppState,
    tokens::credential::{self, Claims, TokenStatus},
};

/// The verified identity attached to authenticated requests.
#[derive(Clone)]
pub struct CurrentUser(pub Claims);

/// A middleware that resolves a verified identity from the session cookie,
/// using the access-token cache fast path with a refresh fallback.
///
/// Every failure mode collapses to `NeedAuthentication`; the distinction
/// between a missing, tampered, expired, or superseded credential stays in
/// the server logs.
pub async fn require_auth<S: AccountStore, V: IdentityVerifier>(
    State(state): State<AppState<S, V>>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let Some(session_cookie) = cookies.get(cookie::SESSION_COOKIE) else {
        tracing::debug!("No session cookie on request");
        return Err(AppError::NeedAuthentication);
    };

    let (account_id, nonce) = match cookie::decode(state.cookie_key(), session_cookie.value()) {
        CookieStatus::Valid { account_id, nonce } => (account_id, nonce),
        CookieStatus::Invalid(reason) => {
            tracing::debug!("Unusable session cookie: {}", reason);
            return Err(AppError::NeedAuthentication);
        }
    };

    let token = match state.sessions.cache().get(account_id).await {
        Some(token) => token,
        None => state
            .sessions
            .refresh(account_id, &nonce)
            .await?
            .ok_or(AppError::NeedAuthentication)?,
    };

    // Cache hits are re-verified too: an entry just past the clock-skew edge
    // must not slip through.
    let claims = match credential::verify(&token, state.sessions.access_secret()) {
        TokenStatus::Valid(claims) => claims,
        TokenStatus::Invalid(reason) => {
            tracing::warn!("Access credential for account {} invalid: {}", account_id, reason);
            return Err(AppError::NeedAuthentication);
        }
    };

    request.extensions_mut().insert(CurrentUser(claims));

    Ok(next.run(request).await)
}

/// A middleware layered after [`require_auth`] that additionally requires the
/// account to be active. Rejects with `NotAuthorized` rather than
/// `NeedAuthentication`: the caller is known, just not allowed.
pub async fn require_active<S: AccountStore, V: IdentityVerifier>(
    State(state): State<AppState<S, V>>,
    Extension(user): Extension<CurrentUser>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let account = state
        .sessions
        .store()
        .find_by_id(user.0.payload.account_id)
        .await?
        .ok_or(AppError::NeedAuthentication)?;

    if account.status != AccountStatus::Active {
        return Err(AppError::NotAuthorized);
    }

    Ok(next.run(request).await)
}
