//! Remote surfaces the admin services depend on
//!
//! Three traits, one per backend service. `HostedBackend` implements all of
//! them; tests swap in in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::{AuditEntry, AuthUser, PermissionRow, Role, Session};

use crate::ClientResult;

/// Session and identity operations
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// The locally persisted session, if any. Expiry is not checked here.
    async fn get_session(&self) -> ClientResult<Option<Session>>;

    /// The identity behind the current session
    async fn get_user(&self) -> ClientResult<Option<AuthUser>>;

    /// Exchange credentials for a session and persist it
    async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session>;

    /// Revoke the remote session
    async fn sign_out(&self) -> ClientResult<()>;

    /// Opaque eligibility check for the admin surface
    async fn is_admin_user(&self) -> ClientResult<bool>;
}

/// Tabular store: admin users, role permissions and the audit log
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Role record for an admin email, `None` when the row is missing
    async fn admin_role(&self, email: &str) -> ClientResult<Option<Role>>;

    /// Every (role, action, allowed) tuple
    async fn role_permissions(&self) -> ClientResult<Vec<PermissionRow>>;

    async fn insert_audit_logs(&self, entries: &[AuditEntry]) -> ClientResult<()>;

    /// Delete audit rows that occurred strictly before `cutoff`
    async fn delete_audit_logs_before(&self, cutoff: DateTime<Utc>) -> ClientResult<()>;
}

/// Sort order for object listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Listing window for the blob store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub prefix: String,
    pub limit: u32,
    pub offset: u32,
    pub sort_column: String,
    pub order: SortOrder,
}

impl Default for ListOptions {
    /// Everything under the bucket root, newest first, up to 1000 objects
    fn default() -> Self {
        Self {
            prefix: String::new(),
            limit: 1000,
            offset: 0,
            sort_column: "created_at".to_string(),
            order: SortOrder::Desc,
        }
    }
}

/// A decoded object listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub size: u64,
    pub mime_type: Option<String>,
}

/// Object storage for the media bucket
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list(&self, options: &ListOptions) -> ClientResult<Vec<StorageObject>>;

    /// Public URL for an object; pure, no remote call
    fn public_url(&self, name: &str) -> String;

    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> ClientResult<()>;

    async fn remove(&self, names: &[String]) -> ClientResult<()>;
}
