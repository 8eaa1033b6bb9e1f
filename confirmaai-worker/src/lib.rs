//! # ConfirmaAí Worker Library
//!
//! Background notification jobs for ConfirmaAí.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `gateway`: Outbound WhatsApp gateways (Evolution API, mock)
//! - `scheduler`: Confirmation, reminder and no-show jobs
//! - `runner`: Periodic loop with graceful shutdown
//!
//! ## Example
//!
//! ```no_run
//! use confirmaai_worker::gateway::{MessageGateway, MockGateway};
//!
//! # async fn example() {
//! let gateway = MockGateway::new();
//! gateway.send_text("+5511999998888", "Olá!").await.ok();
//! println!("Gateway: {}", gateway.name());
//! # }
//! ```

pub mod config;
pub mod gateway;
pub mod runner;
pub mod scheduler;
