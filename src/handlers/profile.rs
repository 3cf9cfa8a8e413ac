use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::account::{AccountPreferences, AccountView},
    repositories::account::AccountStore,
    services::identity::IdentityVerifier,
    state::AppState,
    validation::login::validate_preferences,
};

/// Returns the authenticated account's public profile.
pub async fn get_profile<S: AccountStore, V: IdentityVerifier>(
    State(state): State<AppState<S, V>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    let account = state
        .sessions
        .store()
        .find_by_id(user.0.payload.account_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(AccountView::from(&account)))
}

/// Updates the authenticated account's chat preferences.
pub async fn update_profile<S: AccountStore, V: IdentityVerifier>(
    State(state): State<AppState<S, V>>,
    Extension(user): Extension<CurrentUser>,
    Json(preferences): Json<AccountPreferences>,
) -> Result<impl IntoResponse> {
    validate_preferences(&preferences)?;

    let account = state
        .sessions
        .store()
        .update_preferences(user.0.payload.account_id, &preferences)
        .await?;

    tracing::debug!("Preferences updated for account {}", account.id);

    Ok(Json(AccountView::from(&account)))
}
