//! Audit log entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known audit actions
///
/// Entries store the action as free text so pages can log their own names;
/// these are the ones the core services emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    Login,
    Logout,
    MediaUploaded,
    MediaDeleted,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "auth.login",
            AuditAction::Logout => "auth.logout",
            AuditAction::MediaUploaded => "media.upload",
            AuditAction::MediaDeleted => "media.delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

/// Immutable audit record, one row of the remote `audit_logs` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    /// Actor email, `"unknown"` when it could not be resolved
    pub actor_email: String,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub const UNKNOWN_ACTOR: &'static str = "unknown";

    pub fn new(
        action: impl Into<String>,
        actor_email: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            action: action.into(),
            actor_email: actor_email.unwrap_or_else(|| Self::UNKNOWN_ACTOR.to_string()),
            details,
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_actor_is_unknown() {
        let entry = AuditEntry::new(AuditAction::MediaDeleted, None, serde_json::json!({}));
        assert_eq!(entry.actor_email, "unknown");
        assert_eq!(entry.action, "media.delete");
    }

    #[test]
    fn test_serializes_table_columns() {
        let entry = AuditEntry::new("events.edit", Some("a@b.co".into()), serde_json::json!({"id": 7}));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["action"], "events.edit");
        assert_eq!(value["actor_email"], "a@b.co");
        assert_eq!(value["details"]["id"], 7);
        assert!(value["occurred_at"].is_string());
    }
}
