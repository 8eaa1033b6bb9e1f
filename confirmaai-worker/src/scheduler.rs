/// Notification jobs
///
/// One scheduler run executes three jobs in order:
///
/// 1. **Confirmations**: PENDING appointments whose confirmation window is
///    open and that haven't been sent one yet
/// 2. **Reminders**: PENDING appointments already sent a confirmation but no
///    reminder, once the reminder window opens
/// 3. **No-shows**: PENDING appointments already in the past become NO_SHOW
///
/// A job that fails is logged and the next one still runs. Within a job a
/// failed send is logged as FAILED and the appointment stays eligible, so the
/// next run retries it.
///
/// # Example
///
/// ```no_run
/// use confirmaai_shared::clinic_time::ClinicTime;
/// use confirmaai_worker::gateway::MockGateway;
/// use confirmaai_worker::scheduler::Scheduler;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example(pool: PgPool) {
/// let scheduler = Scheduler::new(pool, Arc::new(MockGateway::new()), ClinicTime::default());
/// let report = scheduler.run_scheduler_jobs(chrono::Utc::now()).await;
/// println!("{:?}", report);
/// # }
/// ```

use crate::gateway::{GatewayError, MessageGateway};
use chrono::{DateTime, Utc};
use confirmaai_shared::{
    clinic_time::ClinicTime,
    models::{
        appointment::{Appointment, OutboundCandidate},
        message_log::MessageType,
    },
    schedule::send_window_open,
    templates::{format_message, MessageData},
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Outcome of one messaging job
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobReport {
    /// Candidates looked at
    pub considered: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Outcome of a full run; `None` marks a job that errored out
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub confirmations: Option<JobReport>,
    pub reminders: Option<JobReport>,
    pub no_shows: Option<u64>,
}

/// A rendered message ready to go out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub appointment_id: Uuid,
    pub phone: String,
    pub text: String,
}

/// Keeps the candidates whose send window is open and renders their template
///
/// Dates and times in the text are shown in clinic time.
pub fn due_messages(
    candidates: &[OutboundCandidate],
    now: DateTime<Utc>,
    clinic: ClinicTime,
) -> Vec<OutboundMessage> {
    candidates
        .iter()
        .filter(|c| send_window_open(now, c.date_time, c.hours_before))
        .map(|c| {
            let data = MessageData::for_appointment(
                &c.patient_name,
                &c.clinic_name,
                &clinic.to_local(c.date_time),
            );
            OutboundMessage {
                appointment_id: c.appointment_id,
                phone: c.patient_phone.clone(),
                text: format_message(&c.template, &data),
            }
        })
        .collect()
}

pub struct Scheduler {
    db: PgPool,
    gateway: Arc<dyn MessageGateway>,
    clinic: ClinicTime,
}

impl Scheduler {
    pub fn new(db: PgPool, gateway: Arc<dyn MessageGateway>, clinic: ClinicTime) -> Self {
        Scheduler {
            db,
            gateway,
            clinic,
        }
    }

    /// Runs the three jobs in sequence
    ///
    /// Never fails: each job's error is logged and recorded as `None`.
    pub async fn run_scheduler_jobs(&self, now: DateTime<Utc>) -> RunReport {
        tracing::info!(gateway = self.gateway.name(), "Scheduler run starting");

        let confirmations = match self.send_confirmations(now).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "Confirmation job failed");
                None
            }
        };

        let reminders = match self.send_reminders(now).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, "Reminder job failed");
                None
            }
        };

        let no_shows = match self.mark_no_shows(now).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::error!(error = %e, "No-show job failed");
                None
            }
        };

        let report = RunReport {
            confirmations,
            reminders,
            no_shows,
        };
        tracing::info!(?report, "Scheduler run finished");

        report
    }

    pub async fn send_confirmations(&self, now: DateTime<Utc>) -> Result<JobReport, SchedulerError> {
        let candidates = Appointment::confirmation_candidates(&self.db, now).await?;
        Ok(self
            .deliver(MessageType::Confirmation, &candidates, now)
            .await)
    }

    pub async fn send_reminders(&self, now: DateTime<Utc>) -> Result<JobReport, SchedulerError> {
        let candidates = Appointment::reminder_candidates(&self.db, now).await?;
        Ok(self.deliver(MessageType::Reminder, &candidates, now).await)
    }

    pub async fn mark_no_shows(&self, now: DateTime<Utc>) -> Result<u64, SchedulerError> {
        let count = Appointment::mark_no_shows(&self.db, now).await?;
        if count > 0 {
            tracing::info!(count, "Appointments marked as no-show");
        }
        Ok(count)
    }

    async fn deliver(
        &self,
        message_type: MessageType,
        candidates: &[OutboundCandidate],
        now: DateTime<Utc>,
    ) -> JobReport {
        let mut report = JobReport {
            considered: candidates.len(),
            ..Default::default()
        };

        for message in due_messages(candidates, now, self.clinic) {
            match self.send_one(message_type, &message, now).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        appointment_id = %message.appointment_id,
                        message_type = message_type.as_str(),
                        error = %e,
                        "Message not delivered"
                    );
                }
            }
        }

        tracing::info!(
            message_type = message_type.as_str(),
            considered = report.considered,
            sent = report.sent,
            failed = report.failed,
            "Messaging job done"
        );

        report
    }

    async fn send_one(
        &self,
        message_type: MessageType,
        message: &OutboundMessage,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        if let Err(e) = self.gateway.send_text(&message.phone, &message.text).await {
            if let Err(log_err) =
                Appointment::record_message_failed(&self.db, message.appointment_id, message_type, now)
                    .await
            {
                tracing::error!(
                    appointment_id = %message.appointment_id,
                    error = %log_err,
                    "Failed to log failed message"
                );
            }
            return Err(e.into());
        }

        Appointment::record_message_sent(&self.db, message.appointment_id, message_type, now).await?;

        tracing::debug!(
            appointment_id = %message.appointment_id,
            message_type = message_type.as_str(),
            "Message sent"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn candidate(date_time: DateTime<Utc>, hours_before: i32) -> OutboundCandidate {
        OutboundCandidate {
            appointment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            date_time,
            patient_name: "Maria".to_string(),
            patient_phone: "+5511999998888".to_string(),
            clinic_name: "Clínica Sorriso".to_string(),
            hours_before,
            template: "Olá {nome}! Consulta em {clinica} no dia {data} às {hora}.".to_string(),
        }
    }

    #[test]
    fn test_due_messages_filters_by_window() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let inside = candidate(now + Duration::hours(23), 24);
        let outside = candidate(now + Duration::hours(30), 24);

        let due = due_messages(&[inside.clone(), outside], now, ClinicTime::default());

        assert_eq!(due.len(), 1);
        assert_eq!(due[0].appointment_id, inside.appointment_id);
        assert_eq!(due[0].phone, "+5511999998888");
    }

    #[test]
    fn test_due_messages_render_in_clinic_time() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        // 17:30 UTC is 14:30 in São Paulo
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 17, 30, 0).unwrap();
        let clinic = ClinicTime::from_hours(-3).unwrap();

        let due = due_messages(&[candidate(at, 48)], now, clinic);

        assert_eq!(
            due[0].text,
            "Olá Maria! Consulta em Clínica Sorriso no dia terça-feira, 10 de março às 14:30."
        );
    }

    #[test]
    fn test_due_messages_skips_past_appointments() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let due = due_messages(&[candidate(now - Duration::minutes(1), 24)], now, ClinicTime::default());
        assert!(due.is_empty());
    }

    #[test]
    fn test_run_report_default_is_empty() {
        let report = RunReport::default();
        assert_eq!(report.confirmations, None);
        assert_eq!(report.no_shows, None);
    }
}
