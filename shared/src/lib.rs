//! Shared types for the admin back-office
//!
//! Domain types used by both the backend client and the admin services:
//! roles and the action registry, the permission matrix, media assets,
//! audit entries, sessions, and the unified error system.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
