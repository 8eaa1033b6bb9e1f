/// Database models for ConfirmaAí
///
/// Every model is a plain struct deriving `sqlx::FromRow` with associated
/// async functions running hand-written SQL against a `PgPool`.
///
/// # Models
///
/// - `user`: Clinic accounts; each user is one tenant
/// - `settings`: Per-user send windows and message templates
/// - `patient`: The clinic's patients
/// - `appointment`: Appointments and their confirmation lifecycle
/// - `message_log`: WhatsApp messages sent for an appointment and the replies
///
/// Tenant-scoped lookups always take the owning `user_id` so a handler can't
/// read another clinic's rows by guessing an ID.

pub mod appointment;
pub mod message_log;
pub mod patient;
pub mod settings;
pub mod user;
