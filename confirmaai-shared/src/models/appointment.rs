/// Appointment model and database operations
///
/// # Lifecycle
///
/// ```text
/// PENDING ──(patient replies yes)──▶ CONFIRMED
///         ──(patient replies no)───▶ CANCELED
///         ──(time passes)──────────▶ NO_SHOW
/// ```
///
/// The clinic can also set any status by hand through the API
/// (`NOT_CONFIRMED` is only ever set that way).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE appointment_status AS ENUM (
///     'PENDING', 'CONFIRMED', 'NOT_CONFIRMED', 'CANCELED', 'NO_SHOW'
/// );
///
/// CREATE TABLE appointments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     patient_id UUID NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
///     date_time TIMESTAMPTZ NOT NULL,
///     status appointment_status NOT NULL DEFAULT 'PENDING',
///     notes TEXT,
///     confirmation_sent_at TIMESTAMPTZ,
///     reminder_sent_at TIMESTAMPTZ,
///     confirmed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::message_log::{CreateMessageLog, MessageLog, MessageStatus, MessageType};
use crate::dashboard::AppointmentSnapshot;

const APPOINTMENT_COLUMNS: &str = "a.id, a.user_id, a.patient_id, a.date_time, a.status, a.notes, \
     a.confirmation_sent_at, a.reminder_sent_at, a.confirmed_at, a.created_at, a.updated_at";

const RETURNING_COLUMNS: &str = "id, user_id, patient_id, date_time, status, notes, \
     confirmation_sent_at, reminder_sent_at, confirmed_at, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    /// Waiting for the patient's answer
    Pending,

    Confirmed,

    /// Marked by the clinic as not confirmed
    NotConfirmed,

    Canceled,

    /// The appointment time passed while still pending
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::NotConfirmed,
        AppointmentStatus::Canceled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "PENDING",
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::NotConfirmed => "NOT_CONFIRMED",
            AppointmentStatus::Canceled => "CANCELED",
            AppointmentStatus::NoShow => "NO_SHOW",
        }
    }

    /// Active appointments occupy their time slot and block patient deletion
    pub fn is_active(&self) -> bool {
        !matches!(self, AppointmentStatus::Canceled | AppointmentStatus::NoShow)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown appointment status: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,

    /// Owning clinic user
    pub user_id: Uuid,

    pub patient_id: Uuid,

    pub date_time: DateTime<Utc>,

    pub status: AppointmentStatus,

    pub notes: Option<String>,

    /// Set once the confirmation message went out
    pub confirmation_sent_at: Option<DateTime<Utc>>,

    /// Set once the reminder message went out
    pub reminder_sent_at: Option<DateTime<Utc>>,

    /// When the patient confirmed
    pub confirmed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Patient fields embedded in appointment responses
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

/// Appointment with its patient and message history
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,

    pub patient: PatientSummary,

    /// Newest first
    pub message_logs: Vec<MessageLog>,
}

#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Partial appointment update; `notes: Some(None)` clears the notes
#[derive(Debug, Clone, Default)]
pub struct UpdateAppointment {
    pub patient_id: Option<Uuid>,
    pub date_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<Option<String>>,
}

/// List filter; bounds are inclusive
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<Uuid>,
}

/// A PENDING appointment joined with what the scheduler needs to message it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboundCandidate {
    pub appointment_id: Uuid,
    pub user_id: Uuid,
    pub date_time: DateTime<Utc>,
    pub patient_name: String,
    pub patient_phone: String,
    pub clinic_name: String,
    /// `confirmation_hours_before` or `reminder_hours_before`, per job
    pub hours_before: i32,
    /// Confirmation or reminder template, per job
    pub template: String,
}

impl Appointment {
    pub async fn create(pool: &PgPool, data: CreateAppointment) -> Result<Self, sqlx::Error> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            INSERT INTO appointments (user_id, patient_id, date_time, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING {RETURNING_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.patient_id)
        .bind(data.date_time)
        .bind(data.notes)
        .fetch_one(pool)
        .await?;

        Ok(appointment)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(appointment)
    }

    /// Finds an appointment with tenant isolation
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = $1 AND a.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(appointment)
    }

    /// Lists the user's appointments, earliest first
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let appointments = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments a
            WHERE a.user_id = $1
              AND ($2::timestamptz IS NULL OR a.date_time >= $2)
              AND ($3::timestamptz IS NULL OR a.date_time <= $3)
              AND ($4::appointment_status IS NULL OR a.status = $4)
              AND ($5::uuid IS NULL OR a.patient_id = $5)
            ORDER BY a.date_time ASC
            "#
        ))
        .bind(user_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.status)
        .bind(filter.patient_id)
        .fetch_all(pool)
        .await?;

        Ok(appointments)
    }

    /// Attaches patient summaries and message logs to appointments
    ///
    /// Two queries regardless of how many appointments are passed in.
    /// Appointments whose patient row vanished concurrently are dropped.
    pub async fn with_details(
        pool: &PgPool,
        appointments: Vec<Self>,
    ) -> Result<Vec<AppointmentDetails>, sqlx::Error> {
        if appointments.is_empty() {
            return Ok(Vec::new());
        }

        let appointment_ids: Vec<Uuid> = appointments.iter().map(|a| a.id).collect();
        let patient_ids: Vec<Uuid> = appointments.iter().map(|a| a.patient_id).collect();

        let patients: HashMap<Uuid, PatientSummary> = sqlx::query_as::<_, PatientSummary>(
            "SELECT id, name, phone FROM patients WHERE id = ANY($1)",
        )
        .bind(&patient_ids)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

        let mut logs: HashMap<Uuid, Vec<MessageLog>> = HashMap::new();
        for log in MessageLog::list_by_appointments(pool, &appointment_ids).await? {
            logs.entry(log.appointment_id).or_default().push(log);
        }

        Ok(appointments
            .into_iter()
            .filter_map(|appointment| {
                let patient = patients.get(&appointment.patient_id)?.clone();
                let message_logs = logs.remove(&appointment.id).unwrap_or_default();
                Some(AppointmentDetails {
                    appointment,
                    patient,
                    message_logs,
                })
            })
            .collect())
    }

    /// True when another active appointment of the user sits at exactly `date_time`
    pub async fn has_conflict(
        pool: &PgPool,
        user_id: Uuid,
        date_time: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE user_id = $1
                  AND date_time = $2
                  AND status NOT IN ('CANCELED', 'NO_SHOW')
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(date_time)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Applies a partial update to an appointment owned by `user_id`
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateAppointment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE appointments SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.patient_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", patient_id = ${}", bind_count));
        }
        if data.date_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", date_time = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.notes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", notes = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND user_id = $2 RETURNING {RETURNING_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Appointment>(&query).bind(id).bind(user_id);

        if let Some(patient_id) = data.patient_id {
            q = q.bind(patient_id);
        }
        if let Some(date_time) = data.date_time {
            q = q.bind(date_time);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(notes) = data.notes {
            q = q.bind(notes);
        }

        let appointment = q.fetch_optional(pool).await?;

        Ok(appointment)
    }

    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Status and time of the user's appointments in `[from, to]`
    pub async fn snapshots_in_range(
        pool: &PgPool,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<AppointmentSnapshot>, sqlx::Error> {
        let snapshots = sqlx::query_as::<_, AppointmentSnapshot>(
            r#"
            SELECT date_time, status
            FROM appointments
            WHERE user_id = $1 AND date_time >= $2 AND date_time <= $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(snapshots)
    }

    /// PENDING, not-yet-confirmed-by-message appointments from `now` on
    ///
    /// Users without a settings row are skipped by the join. The send window
    /// itself is checked by the caller.
    pub async fn confirmation_candidates(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundCandidate>, sqlx::Error> {
        let candidates = sqlx::query_as::<_, OutboundCandidate>(
            r#"
            SELECT a.id AS appointment_id, a.user_id, a.date_time,
                   p.name AS patient_name, p.phone AS patient_phone,
                   u.clinic_name,
                   s.confirmation_hours_before AS hours_before,
                   s.confirmation_message AS template
            FROM appointments a
            JOIN patients p ON p.id = a.patient_id
            JOIN users u ON u.id = a.user_id
            JOIN settings s ON s.user_id = a.user_id
            WHERE a.status = 'PENDING'
              AND a.confirmation_sent_at IS NULL
              AND a.date_time >= $1
            ORDER BY a.date_time ASC
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(candidates)
    }

    /// PENDING appointments already sent a confirmation but no reminder
    pub async fn reminder_candidates(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundCandidate>, sqlx::Error> {
        let candidates = sqlx::query_as::<_, OutboundCandidate>(
            r#"
            SELECT a.id AS appointment_id, a.user_id, a.date_time,
                   p.name AS patient_name, p.phone AS patient_phone,
                   u.clinic_name,
                   s.reminder_hours_before AS hours_before,
                   s.reminder_message AS template
            FROM appointments a
            JOIN patients p ON p.id = a.patient_id
            JOIN users u ON u.id = a.user_id
            JOIN settings s ON s.user_id = a.user_id
            WHERE a.status = 'PENDING'
              AND a.confirmation_sent_at IS NOT NULL
              AND a.reminder_sent_at IS NULL
              AND a.date_time >= $1
            ORDER BY a.date_time ASC
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(candidates)
    }

    /// Stamps the sent-at column for `message_type` and logs a SENT message
    ///
    /// Both writes happen in one transaction.
    pub async fn record_message_sent(
        pool: &PgPool,
        id: Uuid,
        message_type: MessageType,
        sent_at: DateTime<Utc>,
    ) -> Result<MessageLog, sqlx::Error> {
        let column = match message_type {
            MessageType::Confirmation => "confirmation_sent_at",
            MessageType::Reminder => "reminder_sent_at",
        };

        let mut tx = pool.begin().await?;

        sqlx::query(&format!(
            "UPDATE appointments SET {column} = $2, updated_at = NOW() WHERE id = $1"
        ))
        .bind(id)
        .bind(sent_at)
        .execute(&mut *tx)
        .await?;

        let log = MessageLog::create(
            &mut *tx,
            CreateMessageLog {
                appointment_id: id,
                message_type,
                status: MessageStatus::Sent,
                sent_at,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(log)
    }

    /// Logs a failed send; the appointment is left untouched so it is retried
    pub async fn record_message_failed(
        pool: &PgPool,
        id: Uuid,
        message_type: MessageType,
        attempted_at: DateTime<Utc>,
    ) -> Result<MessageLog, sqlx::Error> {
        MessageLog::create(
            pool,
            CreateMessageLog {
                appointment_id: id,
                message_type,
                status: MessageStatus::Failed,
                sent_at: attempted_at,
            },
        )
        .await
    }

    /// Turns every PENDING appointment before `now` into NO_SHOW
    ///
    /// Returns how many appointments changed.
    pub async fn mark_no_shows(pool: &PgPool, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET status = 'NO_SHOW', updated_at = NOW()
            WHERE status = 'PENDING' AND date_time < $1
            "#,
        )
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Finds the appointment a reply from `phone` refers to
    ///
    /// Only upcoming PENDING appointments that were already sent a
    /// confirmation qualify; the one confirmed most recently wins. The patient
    /// and the appointment must belong to the same clinic.
    pub async fn find_awaiting_reply(
        pool: &PgPool,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments a
            JOIN patients p ON p.id = a.patient_id
            WHERE p.phone = $1
              AND p.user_id = a.user_id
              AND a.status = 'PENDING'
              AND a.confirmation_sent_at IS NOT NULL
              AND a.date_time >= $2
            ORDER BY a.confirmation_sent_at DESC
            LIMIT 1
            "#
        ))
        .bind(phone)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(appointment)
    }

    /// Applies a patient reply: new status, `confirmed_at` when confirming,
    /// and the reply text on the appointment's message logs
    pub async fn apply_reply(
        pool: &PgPool,
        id: Uuid,
        status: AppointmentStatus,
        response: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let confirmed_at = (status == AppointmentStatus::Confirmed).then_some(at);

        let mut tx = pool.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            UPDATE appointments
            SET status = $2,
                confirmed_at = COALESCE($3, confirmed_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {RETURNING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(confirmed_at)
        .fetch_optional(&mut *tx)
        .await?;

        if appointment.is_some() {
            MessageLog::record_response(&mut *tx, id, response, at).await?;
        }

        tx.commit().await?;

        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in AppointmentStatus::ALL {
            assert_eq!(status.as_str().parse::<AppointmentStatus>(), Ok(status));
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!("pending".parse::<AppointmentStatus>().is_err());
        assert!("ARCHIVED".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_active_statuses() {
        assert!(AppointmentStatus::Pending.is_active());
        assert!(AppointmentStatus::Confirmed.is_active());
        assert!(AppointmentStatus::NotConfirmed.is_active());
        assert!(!AppointmentStatus::Canceled.is_active());
        assert!(!AppointmentStatus::NoShow.is_active());
    }

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(AppointmentStatus::NotConfirmed).unwrap(),
            "NOT_CONFIRMED"
        );
        assert_eq!(
            serde_json::from_str::<AppointmentStatus>("\"NO_SHOW\"").unwrap(),
            AppointmentStatus::NoShow
        );
    }

    #[test]
    fn test_details_flatten_appointment() {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            date_time: Utc::now(),
            status: AppointmentStatus::Pending,
            notes: None,
            confirmation_sent_at: None,
            reminder_sent_at: None,
            confirmed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let details = AppointmentDetails {
            patient: PatientSummary {
                id: appointment.patient_id,
                name: "Maria".to_string(),
                phone: "+5511999998888".to_string(),
            },
            appointment,
            message_logs: Vec::new(),
        };

        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["patient"]["name"], "Maria");
        assert!(json.get("dateTime").is_some());
        assert!(json["messageLogs"].as_array().unwrap().is_empty());
    }
}
