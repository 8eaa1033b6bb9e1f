/// User model and database operations
///
/// A user is a clinic account and the tenant that owns patients,
/// appointments and settings.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,          -- unique on LOWER(email)
///     password_hash TEXT NOT NULL,
///     clinic_name VARCHAR(255) NOT NULL,
///     avg_appointment_value DOUBLE PRECISION NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use confirmaai_shared::models::user::{User, CreateUser};
/// use confirmaai_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let (user, settings) = User::create_with_default_settings(&pool, CreateUser {
///     name: "Dra. Ana Souza".to_string(),
///     email: "ana@clinica.com.br".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     clinic_name: "Clínica Sorriso".to_string(),
///     avg_appointment_value: 150.0,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "ANA@clinica.com.br").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::settings::Settings;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, clinic_name, avg_appointment_value, created_at, updated_at";

/// Clinic account
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Display name of the professional
    pub name: String,

    /// Login email, unique case-insensitively
    pub email: String,

    /// Argon2id PHC hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub clinic_name: String,

    /// Average price of an appointment, used to estimate no-show losses
    pub avg_appointment_value: f64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    /// Stored trimmed and lowercased
    pub email: String,
    /// Argon2id hash, never the plaintext password
    pub password_hash: String,
    pub clinic_name: String,
    pub avg_appointment_value: f64,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Inserts a user
    ///
    /// # Errors
    ///
    /// Returns a database error (unique violation on `idx_users_email_lower`)
    /// when the email is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, clinic_name, avg_appointment_value)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.clinic_name)
        .bind(data.avg_appointment_value)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Inserts a user and their default settings in one transaction
    ///
    /// Used by registration so an account never exists without settings.
    pub async fn create_with_default_settings(
        pool: &PgPool,
        data: CreateUser,
    ) -> Result<(Self, Settings), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, clinic_name, avg_appointment_value)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.clinic_name)
        .bind(data.avg_appointment_value)
        .fetch_one(&mut *tx)
        .await?;

        let settings = Settings::get_or_create(&mut *tx, user.id).await?;

        tx.commit().await?;

        Ok((user, settings))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email, ignoring case and surrounding whitespace
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = $1)")
                .bind(normalize_email(email))
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Deletes a user; patients, appointments, logs and settings cascade
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
