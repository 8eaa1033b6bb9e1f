//! # ConfirmaAí API Server Library
//!
//! HTTP API for clinics: accounts, patients, appointments, reminder
//! settings, the monthly dashboard and the inbound WhatsApp webhook.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Body and path extractors with JSON error rejections
//! - `middleware`: JWT and security-header layers
//! - `response`: Success envelopes
//! - `routes`: API route handlers
//! - `telemetry`: Tracing subscriber setup

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod telemetry;
