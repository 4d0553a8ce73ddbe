//! Courier
//!
//! Notification dispatch gateway core: messages are submitted as Mail or
//! Text, a pipeline assigns a capable transport provider, attempts
//! delivery, and records every state change for audit and status fan-out.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
