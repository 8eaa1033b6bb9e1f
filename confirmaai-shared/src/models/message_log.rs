/// Message log model and database operations
///
/// One row per WhatsApp message the scheduler tried to send for an
/// appointment. Failed sends are logged too (status `FAILED`). When the
/// patient replies, the reply text is stored on the appointment's
/// successfully sent logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const LOG_COLUMNS: &str =
    r#"id, appointment_id, "type" AS message_type, sent_at, status, response, responded_at"#;

/// Which scheduler job sent the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Confirmation,
    Reminder,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Confirmation => "CONFIRMATION",
            MessageType::Reminder => "REMINDER",
        }
    }
}

/// Delivery status
///
/// The scheduler writes `SENT` or `FAILED`; `DELIVERED` and `READ` are
/// reserved for gateway delivery receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "message_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "SENT",
            MessageStatus::Delivered => "DELIVERED",
            MessageStatus::Read => "READ",
            MessageStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MessageLog {
    pub id: Uuid,

    pub appointment_id: Uuid,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    pub sent_at: DateTime<Utc>,

    pub status: MessageStatus,

    /// Patient's reply text, once received
    pub response: Option<String>,

    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CreateMessageLog {
    pub appointment_id: Uuid,
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub sent_at: DateTime<Utc>,
}

impl MessageLog {
    /// Inserts a log row; usable inside a transaction
    pub async fn create<'e, E>(executor: E, data: CreateMessageLog) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let log = sqlx::query_as::<_, MessageLog>(&format!(
            r#"
            INSERT INTO message_logs (appointment_id, "type", status, sent_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(data.appointment_id)
        .bind(data.message_type)
        .bind(data.status)
        .bind(data.sent_at)
        .fetch_one(executor)
        .await?;

        Ok(log)
    }

    /// Logs of one appointment, newest first
    pub async fn list_by_appointment(
        pool: &PgPool,
        appointment_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        Self::list_by_appointments(pool, &[appointment_id]).await
    }

    /// Logs of several appointments, newest first
    pub async fn list_by_appointments(
        pool: &PgPool,
        appointment_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        if appointment_ids.is_empty() {
            return Ok(Vec::new());
        }

        let logs = sqlx::query_as::<_, MessageLog>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM message_logs
            WHERE appointment_id = ANY($1)
            ORDER BY sent_at DESC
            "#
        ))
        .bind(appointment_ids)
        .fetch_all(pool)
        .await?;

        Ok(logs)
    }

    /// Stores a patient reply on every non-failed log of the appointment
    ///
    /// Returns the number of logs updated.
    pub async fn record_response<'e, E>(
        executor: E,
        appointment_id: Uuid,
        response: &str,
        responded_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE message_logs
            SET response = $2, responded_at = $3
            WHERE appointment_id = $1 AND status <> 'FAILED'
            "#,
        )
        .bind(appointment_id)
        .bind(response)
        .bind(responded_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
