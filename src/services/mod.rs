//! Service layer for the dispatch pipeline.
//!
//! The state authority owns every message mutation; the matcher selects
//! providers; the status publisher fans out terminal outcomes; `providers`
//! holds the runtime contract and its implementations.

mod jitter;
mod matcher;
pub mod providers;
mod state_service;
mod status_publisher;

pub use jitter::{FixedJitter, Jitter, UniformJitter};
pub use matcher::ProviderMatcher;
pub use state_service::MessageStateService;
pub use status_publisher::StatusPublisher;
