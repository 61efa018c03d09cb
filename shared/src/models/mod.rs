//! Data models
//!
//! Shared between the backend client and the admin services.

pub mod action;
pub mod audit;
pub mod media;
pub mod permission;
pub mod role;
pub mod session;

// Re-exports
pub use action::{ACTIONS, Action, find_action, summarize_role_capabilities};
pub use audit::{AuditAction, AuditEntry};
pub use media::{MediaAsset, MediaType, format_size};
pub use permission::{PermissionMatrix, PermissionRow};
pub use role::{Role, RoleOption};
pub use session::{Actor, AuthUser, Session};
