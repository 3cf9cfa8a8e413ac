use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    crypto::cookie,
    error::Result,
    middleware_layer::auth::CurrentUser,
    models::account::AccountView,
    repositories::account::AccountStore,
    services::identity::IdentityVerifier,
    state::AppState,
    validation::login::validate_assertion,
};

/// The request payload for login.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// The response payload for a successful login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub profile: AccountView,
}

/// Builds the session cookie: httpOnly, secure, cross-site.
fn session_cookie(value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(cookie::SESSION_COOKIE, value);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(tower_cookies::cookie::SameSite::None);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie.set_path("/");
    cookie
}

/// Handles login: verifies the identity assertion, establishes the session,
/// and sets the session cookie.
///
/// The cookie is only set after the session manager has durably persisted
/// the refresh credential, so a set cookie can always refresh.
pub async fn login<S: AccountStore, V: IdentityVerifier>(
    State(state): State<AppState<S, V>>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    validate_assertion(&payload.token)?;

    let session = state.sessions.login(&payload.token).await?;

    let blob = cookie::encode(
        state.cookie_key(),
        &session.account.id.to_string(),
        &session.nonce,
    )?;
    cookies.add(session_cookie(blob, state.cookie_life_secs as i64));

    tracing::info!("Login completed for account {}", session.account.id);

    let response = LoginResponse {
        profile: AccountView::from(&session.account),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles logout: tears the session down and clears the session cookie.
pub async fn logout<S: AccountStore, V: IdentityVerifier>(
    State(state): State<AppState<S, V>>,
    Extension(user): Extension<CurrentUser>,
    cookies: Cookies,
) -> Result<Response> {
    let account_id = user.0.payload.account_id;

    state.sessions.logout(account_id).await?;

    // Immediate-expiry overwrite clears the cookie client-side.
    cookies.add(session_cookie(String::new(), 0));

    tracing::info!("Logout completed for account {}", account_id);

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::profile;
    use crate::middleware_layer::auth::{require_active, require_auth};
    use crate::repositories::account::memory::MemoryAccountStore;
    use crate::services::identity::VerifiedIdentity;
    use crate::services::identity::fixed::FixedIdentityVerifier;
    use crate::services::session::{SessionManager, TokenConfig};
    use crate::tokens::cache::AccessTokenCache;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        middleware::from_fn_with_state,
        routing::{delete, get, post, put},
    };
    use tower::ServiceExt;
    use tower_cookies::CookieManagerLayer;
    use uuid::Uuid;

    const ASSERTION: &str = "good-assertion";

    type TestState = AppState<MemoryAccountStore, FixedIdentityVerifier>;

    fn test_state(store: MemoryAccountStore) -> TestState {
        let verifier = FixedIdentityVerifier {
            expected_assertion: ASSERTION.to_string(),
            identity: VerifiedIdentity {
                subject_id: "subject-1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        };
        let sessions = SessionManager::new(
            store,
            verifier,
            AccessTokenCache::new(std::time::Duration::from_secs(60)),
            TokenConfig {
                access_secret: "access-secret".to_string(),
                refresh_secret: "refresh-secret".to_string(),
                access_life_secs: 60,
                refresh_life_secs: 3600,
            },
        );
        AppState::from_parts(sessions, [7u8; 32], 3600)
    }

    fn test_router(state: TestState) -> Router {
        let login_routes = Router::new()
            .route("/api/v1/login", post(login))
            .with_state(state.clone());

        let protected_routes = Router::new()
            .route("/api/v1/login", delete(logout))
            .route("/api/v1/profile", get(profile::get_profile))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state.clone());

        let active_routes = Router::new()
            .route("/api/v1/profile", put(profile::update_profile))
            .route_layer(from_fn_with_state(state.clone(), require_active))
            .route_layer(from_fn_with_state(state.clone(), require_auth))
            .with_state(state.clone());

        Router::new()
            .merge(login_routes)
            .merge(protected_routes)
            .merge(active_routes)
            .layer(CookieManagerLayer::new())
    }

    async fn do_login(router: &Router) -> (String, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"token":"{}"}}"#, ASSERTION)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("login must set the session cookie")
            .to_str()
            .unwrap()
            .to_string();
        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (cookie_pair, body)
    }

    #[tokio::test]
    async fn login_sets_cookie_and_returns_public_profile() {
        let router = test_router(test_state(MemoryAccountStore::new()));
        let (cookie_pair, body) = do_login(&router).await;

        assert!(cookie_pair.starts_with("bc.session="));
        assert_eq!(body["profile"]["status"], "inactive");
        assert_eq!(body["profile"]["email"], "ada@example.com");
        assert!(body["profile"].get("refresh_token").is_none());
        assert!(body["profile"].get("subject_id").is_none());
    }

    #[tokio::test]
    async fn login_attributes_are_strict() {
        let store = MemoryAccountStore::new();
        let router = test_router(test_state(store));

        let response = router
            .oneshot(
                Request::post("/api/v1/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"token":"{}"}}"#, ASSERTION)))
                    .unwrap(),
            )
            .await
            .unwrap();

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("SameSite=None"));
    }

    #[tokio::test]
    async fn login_rejects_bad_assertion() {
        let router = test_router(test_state(MemoryAccountStore::new()));

        let response = router
            .oneshot(
                Request::post("/api/v1/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"token":"forged"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_without_cookie_is_unauthenticated() {
        let router = test_router(test_state(MemoryAccountStore::new()));

        let response = router
            .oneshot(Request::get("/api/v1/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errorCode"], "NeedAuthentication");
    }

    #[tokio::test]
    async fn protected_route_with_session_cookie_succeeds() {
        let router = test_router(test_state(MemoryAccountStore::new()));
        let (cookie_pair, _) = do_login(&router).await;

        let response = router
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn inactive_account_is_rejected_on_active_gated_route() {
        // New accounts start inactive; the status-gated route answers 403,
        // not 401 -- the caller is known, just not allowed.
        let router = test_router(test_state(MemoryAccountStore::new()));
        let (cookie_pair, _) = do_login(&router).await;

        let response = router
            .oneshot(
                Request::put("/api/v1/profile")
                    .header(header::COOKIE, cookie_pair)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"defaultTone":"formal"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errorCode"], "NotAuthorized");
    }

    #[tokio::test]
    async fn cache_miss_with_expired_refresh_credential_is_unauthenticated() {
        let store = MemoryAccountStore::new();
        let state = test_state(store.clone());
        let router = test_router(state.clone());
        let (cookie_pair, body) = do_login(&router).await;

        let account_id: Uuid = body["profile"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        // Force the refresh path and make the persisted credential expired.
        state.sessions.cache().remove(account_id).await;
        let account = store.snapshot(account_id).await.unwrap();
        let expired = {
            use crate::tokens::credential::{Claims, TokenPayload};
            use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
            let claims = Claims {
                payload: TokenPayload::for_account(&account, Some("stale")),
                exp: chrono::Utc::now().timestamp() - 60,
            };
            encode(
                &Header::new(Algorithm::HS256),
                &claims,
                &EncodingKey::from_secret("refresh-secret".as_bytes()),
            )
            .unwrap()
        };
        use crate::repositories::account::AccountStore as _;
        store
            .set_refresh_token(account_id, Some(&expired))
            .await
            .unwrap();

        let response = router
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_cached_access_credential_is_rejected_not_trusted() {
        // A cache hit is re-verified: an entry that slipped past the
        // clock-skew edge (or was corrupted) must not authenticate.
        let store = MemoryAccountStore::new();
        let state = test_state(store.clone());
        let router = test_router(state.clone());
        let (cookie_pair, body) = do_login(&router).await;

        let account_id: Uuid = body["profile"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        // Plant an already-expired, correctly signed access credential so the
        // gate takes the fast path and must reject on verification. Clearing
        // the refresh credential keeps the fallback path from re-minting.
        let account = store.snapshot(account_id).await.unwrap();
        let expired_access = {
            use crate::tokens::credential::{Claims, TokenPayload};
            use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
            let claims = Claims {
                payload: TokenPayload::for_account(&account, None),
                exp: chrono::Utc::now().timestamp() - 60,
            };
            encode(
                &Header::new(Algorithm::HS256),
                &claims,
                &EncodingKey::from_secret("access-secret".as_bytes()),
            )
            .unwrap()
        };
        state.sessions.cache().put(account_id, expired_access).await;
        use crate::repositories::account::AccountStore as _;
        store.set_refresh_token(account_id, None).await.unwrap();

        let response = router
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["errorCode"], "NeedAuthentication");
    }

    #[tokio::test]
    async fn garbage_cached_access_credential_is_rejected() {
        let state = test_state(MemoryAccountStore::new());
        let router = test_router(state.clone());
        let (cookie_pair, body) = do_login(&router).await;

        let account_id: Uuid = body["profile"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        state
            .sessions
            .cache()
            .put(account_id, "not.a.credential".to_string())
            .await;

        let response = router
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stale_cookie_from_prior_login_is_rejected_on_refresh() {
        let state = test_state(MemoryAccountStore::new());
        let router = test_router(state.clone());

        let (first_cookie, first_body) = do_login(&router).await;
        let (second_cookie, _) = do_login(&router).await;

        // Clear the account-keyed cache entry so the stale cookie cannot ride
        // the fast path and must go through the nonce-checked refresh.
        let account_id: Uuid = first_body["profile"]["id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        state.sessions.cache().remove(account_id).await;

        let stale = router
            .clone()
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, first_cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);

        // The current login's cookie still refreshes fine.
        let current = router
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, second_cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(current.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn logout_clears_session_and_cookie() {
        let router = test_router(test_state(MemoryAccountStore::new()));
        let (cookie_pair, _) = do_login(&router).await;

        let response = router
            .clone()
            .oneshot(
                Request::delete("/api/v1/login")
                    .header(header::COOKIE, cookie_pair.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let cleared = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cleared.contains("Max-Age=0"));

        // The old cookie no longer authenticates.
        let after = router
            .oneshot(
                Request::get("/api/v1/profile")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
    }
}
