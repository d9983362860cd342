/// Account model and database operations
///
/// Accounts are the principals that own resources and receive grants. Each
/// account points at (at most) one tenant, whose storage namespace holds the
/// account's files and home directory.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_type AS ENUM ('administrator', 'general');
/// CREATE TYPE account_state AS ENUM ('pending', 'active');
///
/// CREATE TABLE accounts (
///     id SERIAL PRIMARY KEY,
///     user_name VARCHAR(64) NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     phone VARCHAR(32),
///     tenant_id INTEGER REFERENCES tenants(id) ON DELETE SET NULL,
///     account_type account_type NOT NULL DEFAULT 'general',
///     state account_state NOT NULL DEFAULT 'pending',
///     queue VARCHAR(64) NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Administrator accounts are provisioned out-of-band; the service layer only
/// ever inserts `general` accounts.
///
/// # Example
///
/// ```no_run
/// use custodian_shared::models::account::{Account, AccountState, CreateAccount};
/// use custodian_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::from_url("postgresql://localhost/custodian")).await?;
///
/// let account = Account::create(&pool, CreateAccount {
///     user_name: "jdoe".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     email: "jdoe@example.com".to_string(),
///     phone: None,
///     tenant_id: Some(1),
///     state: AccountState::Active,
///     queue: String::new(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Built-in operator account
    Administrator,

    /// Regular account created through the service
    General,
}

/// Activation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    /// Registered but not yet activated by an administrator
    Pending,

    /// Usable account
    Active,
}

impl AccountState {
    /// Converts state to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountState::Pending => "pending",
            AccountState::Active => "active",
        }
    }
}

/// Account record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Account ID
    pub id: i32,

    /// Login name, unique across all accounts
    pub user_name: String,

    /// Argon2id credential hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Contact email
    pub email: String,

    /// Contact phone
    pub phone: Option<String>,

    /// Tenant whose storage namespace holds this account's files
    pub tenant_id: Option<i32>,

    /// Account role
    pub account_type: AccountType,

    /// Activation state
    pub state: AccountState,

    /// Scheduler queue label
    pub queue: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Whether this account is a built-in administrator
    pub fn is_administrator(&self) -> bool {
        self.account_type == AccountType::Administrator
    }
}

/// Input for inserting a new account
///
/// The account type is always `general`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    /// Login name
    pub user_name: String,

    /// Argon2id hash (NOT the plaintext password)
    pub password_hash: String,

    /// Contact email
    pub email: String,

    /// Contact phone
    pub phone: Option<String>,

    /// Initial tenant
    pub tenant_id: Option<i32>,

    /// Initial activation state
    pub state: AccountState,

    /// Scheduler queue label
    pub queue: String,
}

const ACCOUNT_COLUMNS: &str = "id, user_name, password_hash, email, phone, tenant_id, \
     account_type, state, queue, created_at, updated_at";

impl Account {
    /// Inserts a new general account
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken (unique constraint) or the
    /// database fails
    pub async fn create(pool: &PgPool, data: CreateAccount) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO accounts (user_name, password_hash, email, phone, tenant_id, account_type, state, queue) \
             VALUES ($1, $2, $3, $4, $5, 'general', $6, $7) \
             RETURNING {ACCOUNT_COLUMNS}"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(data.user_name)
            .bind(data.password_hash)
            .bind(data.email)
            .bind(data.phone)
            .bind(data.tenant_id)
            .bind(data.state)
            .bind(data.queue)
            .fetch_one(pool)
            .await
    }

    /// Finds an account by ID
    pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an account by exact login name
    pub async fn find_by_name(pool: &PgPool, user_name: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_name = $1");

        sqlx::query_as::<_, Account>(&query)
            .bind(user_name)
            .fetch_optional(pool)
            .await
    }

    /// Writes every mutable field of `account` back to its row
    ///
    /// `updated_at` is taken from the record, so callers stamp it before saving.
    ///
    /// # Returns
    ///
    /// True if the row existed
    pub async fn save(pool: &PgPool, account: &Account) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET user_name = $2,
                password_hash = $3,
                email = $4,
                phone = $5,
                tenant_id = $6,
                state = $7,
                queue = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.user_name)
        .bind(&account.password_hash)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.tenant_id)
        .bind(account.state)
        .bind(&account.queue)
        .bind(account.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes an account by ID
    ///
    /// Grants and owned resources go with it (`ON DELETE CASCADE`).
    ///
    /// # Returns
    ///
    /// True if the account existed
    pub async fn delete(pool: &PgPool, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
