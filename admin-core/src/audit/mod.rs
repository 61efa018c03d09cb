//! Audit logging for administrative actions

mod logger;

pub use logger::{AuditConfig, AuditLogger, FlushState, TrimState};
