use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The status of an account.
///
/// New accounts start `Inactive` until an administrator activates them;
/// status-gated routes reject inactive accounts with 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    /// The database representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    /// Parses the database representation; anything unknown is `Inactive`.
    pub fn from_str(value: &str) -> Self {
        match value {
            "active" => AccountStatus::Active,
            _ => AccountStatus::Inactive,
        }
    }
}

/// Represents an account in the system.
#[derive(Debug, Clone)]
pub struct Account {
    /// The unique identifier for the account.
    pub id: Uuid,
    /// The external-identity subject id. Never exposed to clients.
    pub subject_id: String,
    /// The account's display name.
    pub name: String,
    /// The account's email address.
    pub email: String,
    /// The account's status.
    pub status: AccountStatus,
    /// The single currently-valid refresh credential, if any.
    /// Replaced on every login, cleared on logout. Never exposed to clients.
    pub refresh_token: Option<String>,
    /// Default system instructions for new chats.
    pub default_instructions: String,
    /// Default tone for new chats.
    pub default_tone: String,
    /// Default model for new chats.
    pub default_model: String,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The fields required to create a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub subject_id: String,
    pub name: String,
    pub email: String,
}

/// The public view of an account, safe to return to clients.
///
/// Excludes the external subject id and the refresh credential.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: AccountStatus,
    #[serde(rename = "defaultInstructions")]
    pub default_instructions: String,
    #[serde(rename = "defaultTone")]
    pub default_tone: String,
    #[serde(rename = "defaultModel")]
    pub default_model: String,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            status: account.status,
            default_instructions: account.default_instructions.clone(),
            default_tone: account.default_tone.clone(),
            default_model: account.default_model.clone(),
        }
    }
}

/// The writable chat preference fields of an account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPreferences {
    #[serde(rename = "defaultInstructions")]
    pub default_instructions: Option<String>,
    #[serde(rename = "defaultTone")]
    pub default_tone: Option<String>,
    #[serde(rename = "defaultModel")]
    pub default_model: Option<String>,
}
