//! # ConfirmaAí Shared Library
//!
//! Types, persistence and business rules shared by the ConfirmaAí API server
//! and the notification worker.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, JWT tokens and request authentication
//! - `db`: Connection pool and embedded migrations
//! - `models`: Database models and their SQL operations
//! - `clinic_time`: Clinic-local time conversions (month/day bounds)
//! - `templates`: WhatsApp message templates and pt-BR date formatting
//! - `replies`: Parsing of patient replies received through the webhook
//! - `schedule`: Send-window rules used by the scheduler
//! - `dashboard`: Monthly confirmation / no-show metrics
//! - `validation`: Field checks not covered by `validator` derives

pub mod auth;
pub mod clinic_time;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod replies;
pub mod schedule;
pub mod templates;
pub mod validation;

/// Current version of the ConfirmaAí shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
