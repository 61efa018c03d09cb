//! Core: configuration and the service container
//!
//! - [`Config`] - environment configuration
//! - [`AdminState`] - service container

pub mod config;
pub mod state;

pub use config::{Config, ConfigFallback, MAX_AUDIT_RETENTION_DAYS, PAGE_SIZES};
pub use state::AdminState;
