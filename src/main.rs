use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};

use http::{Method, header};
use std::net::SocketAddr;
use std::time::Duration;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod state;
mod db;
mod crypto {
    pub mod aes;
    pub mod cookie;
}

mod tokens {
    pub mod cache;
    pub mod credential;
}

mod models {
    pub mod account;
}

mod repositories {
    pub mod account;
}

mod services {
    pub mod identity;
    pub mod session;
}

mod handlers {
    pub mod login;
    pub mod profile;
}

mod middleware_layer {
    pub mod auth;
}

mod validation {
    pub mod login;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let state = AppState::new(&config).await?;
    tracing::info!("AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin([config.web_app_origin.parse()?])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::COOKIE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400));

    let login_routes = Router::new()
        .route("/api/v1/login", post(handlers::login::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/v1/login", delete(handlers::login::logout))
        .route("/api/v1/profile", get(handlers::profile::get_profile))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    // Routes that additionally require an activated account.
    let active_routes = Router::new()
        .route("/api/v1/profile", put(handlers::profile::update_profile))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_active,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(login_routes)
        .merge(protected_routes)
        .merge(active_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
