/// Settings model and database operations
///
/// Each clinic user has exactly one settings row holding how many hours
/// before an appointment the confirmation and reminder messages go out, and
/// the message templates themselves (see [`crate::templates`]).
///
/// Rows are created on registration and lazily on first read/update, so
/// accounts created before settings existed still work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::templates::{DEFAULT_CONFIRMATION_MESSAGE, DEFAULT_REMINDER_MESSAGE};

pub const DEFAULT_CONFIRMATION_HOURS_BEFORE: i32 = 24;
pub const DEFAULT_REMINDER_HOURS_BEFORE: i32 = 2;

pub const CONFIRMATION_HOURS_RANGE: std::ops::RangeInclusive<i32> = 1..=72;
pub const REMINDER_HOURS_RANGE: std::ops::RangeInclusive<i32> = 1..=24;

const SETTINGS_COLUMNS: &str = "id, user_id, confirmation_hours_before, reminder_hours_before, \
     confirmation_message, reminder_message, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: Uuid,

    pub user_id: Uuid,

    /// Confirmation window opens this many hours before the appointment (1-72)
    pub confirmation_hours_before: i32,

    /// Reminder window opens this many hours before the appointment (1-24)
    pub reminder_hours_before: i32,

    pub confirmation_message: String,

    pub reminder_message: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Partial settings update; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub confirmation_hours_before: Option<i32>,
    pub reminder_hours_before: Option<i32>,
    pub confirmation_message: Option<String>,
    pub reminder_message: Option<String>,
}

impl UpdateSettings {
    pub fn is_empty(&self) -> bool {
        self.confirmation_hours_before.is_none()
            && self.reminder_hours_before.is_none()
            && self.confirmation_message.is_none()
            && self.reminder_message.is_none()
    }
}

impl Settings {
    /// Returns the user's settings, inserting the defaults if there are none
    ///
    /// Works with a pool or inside a transaction. The upsert makes concurrent
    /// first requests converge on a single row.
    pub async fn get_or_create<'e, E>(executor: E, user_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let settings = sqlx::query_as::<_, Settings>(&format!(
            r#"
            INSERT INTO settings (user_id, confirmation_hours_before, reminder_hours_before,
                                  confirmation_message, reminder_message)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING {SETTINGS_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(DEFAULT_CONFIRMATION_HOURS_BEFORE)
        .bind(DEFAULT_REMINDER_HOURS_BEFORE)
        .bind(DEFAULT_CONFIRMATION_MESSAGE)
        .bind(DEFAULT_REMINDER_MESSAGE)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let settings = sqlx::query_as::<_, Settings>(&format!(
            "SELECT {SETTINGS_COLUMNS} FROM settings WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(settings)
    }

    /// Applies a partial update, creating the row first when missing
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        data: UpdateSettings,
    ) -> Result<Self, sqlx::Error> {
        let current = Self::get_or_create(pool, user_id).await?;
        if data.is_empty() {
            return Ok(current);
        }

        let settings = sqlx::query_as::<_, Settings>(&format!(
            r#"
            UPDATE settings SET
                confirmation_hours_before = COALESCE($2, confirmation_hours_before),
                reminder_hours_before = COALESCE($3, reminder_hours_before),
                confirmation_message = COALESCE($4, confirmation_message),
                reminder_message = COALESCE($5, reminder_message),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {SETTINGS_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(data.confirmation_hours_before)
        .bind(data.reminder_hours_before)
        .bind(data.confirmation_message)
        .bind(data.reminder_message)
        .fetch_one(pool)
        .await?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_within_ranges() {
        assert!(CONFIRMATION_HOURS_RANGE.contains(&DEFAULT_CONFIRMATION_HOURS_BEFORE));
        assert!(REMINDER_HOURS_RANGE.contains(&DEFAULT_REMINDER_HOURS_BEFORE));
    }

    #[test]
    fn test_update_settings_is_empty() {
        assert!(UpdateSettings::default().is_empty());
        assert!(!UpdateSettings {
            reminder_hours_before: Some(3),
            ..Default::default()
        }
        .is_empty());
    }
}
