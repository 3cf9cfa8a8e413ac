use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::account::{Account, AccountPreferences, AccountStatus, NewAccount},
};

/// Persistence contract for accounts.
///
/// The refresh-credential column is last-write-wins on purpose: overwriting
/// a stale refresh credential is the single-session invalidation mechanism,
/// not a conflict to resolve.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait AccountStore: Clone + Send + Sync + 'static {
    /// Finds an account by its external-identity subject id.
    fn find_by_subject_id(
        &self,
        subject_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Finds an account by its id.
    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Account>>> + Send;

    /// Creates a new account. New accounts start with status `inactive`.
    fn create(
        &self,
        new: NewAccount,
    ) -> impl std::future::Future<Output = Result<Account>> + Send;

    /// Replaces (or clears, with `None`) the account's refresh credential.
    ///
    /// Fails with `AppError::NotFound` when the account does not exist.
    fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Updates the account's chat preference fields, returning the new state.
    fn update_preferences(
        &self,
        id: Uuid,
        preferences: &AccountPreferences,
    ) -> impl std::future::Future<Output = Result<Account>> + Send;
}

/// The PostgreSQL-backed account store.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: Pool,
}

impl PgAccountStore {
    /// Creates a new store over the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// A helper function to map a `tokio_postgres::Row` to an `Account`.
fn row_to_account(row: &Row) -> Result<Account> {
    let status: String = row
        .try_get("status")
        .map_err(|_| AppError::Internal("missing column: status".to_string()))?;

    Ok(Account {
        id: row
            .try_get("id")
            .map_err(|_| AppError::Internal("missing column: id".to_string()))?,
        subject_id: row
            .try_get("subject_id")
            .map_err(|_| AppError::Internal("missing column: subject_id".to_string()))?,
        name: row
            .try_get("name")
            .map_err(|_| AppError::Internal("missing column: name".to_string()))?,
        email: row
            .try_get("email")
            .map_err(|_| AppError::Internal("missing column: email".to_string()))?,
        status: AccountStatus::from_str(&status),
        refresh_token: row
            .try_get("refresh_token")
            .map_err(|_| AppError::Internal("missing column: refresh_token".to_string()))?,
        default_instructions: row
            .try_get("default_instructions")
            .map_err(|_| AppError::Internal("missing column: default_instructions".to_string()))?,
        default_tone: row
            .try_get("default_tone")
            .map_err(|_| AppError::Internal("missing column: default_tone".to_string()))?,
        default_model: row
            .try_get("default_model")
            .map_err(|_| AppError::Internal("missing column: default_model".to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|_| AppError::Internal("missing column: created_at".to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|_| AppError::Internal("missing column: updated_at".to_string()))?,
    })
}

impl AccountStore for PgAccountStore {
    async fn find_by_subject_id(&self, subject_id: &str) -> Result<Option<Account>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, subject_id, name, email, status, refresh_token,
                       default_instructions, default_tone, default_model,
                       created_at, updated_at
                FROM accounts
                WHERE subject_id = $1
                "#,
                &[&subject_id],
            )
            .await?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, subject_id, name, email, status, refresh_token,
                       default_instructions, default_tone, default_model,
                       created_at, updated_at
                FROM accounts
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_account(&r)).transpose()
    }

    async fn create(&self, new: NewAccount) -> Result<Account> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let row = client
            .query_one(
                r#"
                INSERT INTO accounts (id, subject_id, name, email, status)
                VALUES ($1, $2, $3, $4, 'inactive')
                RETURNING id, subject_id, name, email, status, refresh_token,
                          default_instructions, default_tone, default_model,
                          created_at, updated_at
                "#,
                &[&id, &new.subject_id, &new.name, &new.email],
            )
            .await?;
        row_to_account(&row)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<()> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE accounts
                SET refresh_token = $1, updated_at = NOW()
                WHERE id = $2
                "#,
                &[&token, &id],
            )
            .await?;

        if updated == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn update_preferences(
        &self,
        id: Uuid,
        preferences: &AccountPreferences,
    ) -> Result<Account> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                UPDATE accounts
                SET default_instructions = COALESCE($1, default_instructions),
                    default_tone = COALESCE($2, default_tone),
                    default_model = COALESCE($3, default_model),
                    updated_at = NOW()
                WHERE id = $4
                RETURNING id, subject_id, name, email, status, refresh_token,
                          default_instructions, default_tone, default_model,
                          created_at, updated_at
                "#,
                &[
                    &preferences.default_instructions,
                    &preferences.default_tone,
                    &preferences.default_model,
                    &id,
                ],
            )
            .await?
            .ok_or(AppError::NotFound)?;
        row_to_account(&row)
    }
}
