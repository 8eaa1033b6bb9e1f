/// Database layer for ConfirmaAí
///
/// The API server and the notification worker share one PostgreSQL database.
/// Both create a pool with [`pool::create_pool`] and apply the embedded
/// migrations with [`migrations::run_migrations`] on startup.
///
/// Models and their queries live in the crate-level `models` module.

pub mod migrations;
pub mod pool;
