use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use typed_builder::TypedBuilder;
use uuid::Uuid;

pub const ACCOUNTS_EMAIL_KEY: &str = "accounts_email_key";
pub const ACCOUNTS_PHONE_KEY: &str = "accounts_phone_key";

/// Privilege tier, lowest first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, Default,
)]
#[sqlx(type_name = "account_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Staff,
    Admin,
    /// Granted to the first account ever created and to configured override contacts
    SuperAdmin,
}

/// Account - owns exactly one member profile
///
/// At least one of `email` / `phone` is set; each is unique across accounts.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(TypedBuilder)]
pub struct NewAccount<'a> {
    #[builder(default)]
    pub email: Option<&'a str>,
    #[builder(default)]
    pub phone: Option<&'a str>,
    pub credential_hash: &'a str,
    #[builder(default)]
    pub role: Role,
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Account {
    pub async fn find_by_id<'e>(id: Uuid, executor: impl PgExecutor<'e>) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_one(executor)
            .await
    }

    /// Find account by (normalized) email
    pub async fn find_by_email<'e>(
        email: &str,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Find account by (normalized) phone number
    pub async fn find_by_phone<'e>(
        phone: &str,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM accounts WHERE phone = $1")
            .bind(phone)
            .fetch_optional(executor)
            .await
    }

    /// Total number of accounts ever created, deactivated ones included
    pub async fn count<'e>(executor: impl PgExecutor<'e>) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(executor)
            .await
    }

    /// Insert a new account.
    ///
    /// Fails with a unique violation on `accounts_email_key` / `accounts_phone_key`
    /// if the contact was taken after the caller's pre-check.
    pub async fn insert<'e>(
        params: &NewAccount<'_>,
        executor: impl PgExecutor<'e>,
    ) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO accounts (id, email, phone, credential_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(params.email)
        .bind(params.phone)
        .bind(params.credential_hash)
        .bind(params.role)
        .fetch_one(executor)
        .await
    }

    /// Soft-deactivate an account. Accounts are never deleted.
    pub async fn deactivate<'e>(id: Uuid, executor: impl PgExecutor<'e>) -> sqlx::Result<Self> {
        sqlx::query_as::<_, Self>("UPDATE accounts SET active = false WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_one(executor)
            .await
    }
}
