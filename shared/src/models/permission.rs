//! Permission matrix (role → action key → allowed)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::role::Role;

/// One row of the remote `role_permissions` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRow {
    pub role: String,
    pub action_key: String,
    pub allowed: bool,
}

impl PermissionRow {
    pub fn new(role: impl Into<String>, action_key: impl Into<String>, allowed: bool) -> Self {
        Self {
            role: role.into(),
            action_key: action_key.into(),
            allowed,
        }
    }
}

/// Fail-closed permission matrix
///
/// Every known role has an entry, possibly empty. A key absent for a role is
/// denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    grants: HashMap<Role, HashMap<String, bool>>,
}

impl PermissionMatrix {
    /// Matrix with an empty entry for every known role
    pub fn empty() -> Self {
        let grants = Role::known()
            .into_iter()
            .map(|role| (role, HashMap::new()))
            .collect();
        Self { grants }
    }

    /// Fold remote rows into a per-role mapping
    ///
    /// Later rows for the same (role, key) pair overwrite earlier ones.
    pub fn from_rows(rows: impl IntoIterator<Item = PermissionRow>) -> Self {
        let mut matrix = Self::empty();
        for row in rows {
            matrix
                .grants
                .entry(Role::parse(&row.role))
                .or_default()
                .insert(row.action_key, row.allowed);
        }
        matrix
    }

    /// Whether `role` is granted `action_key`; absent means denied
    pub fn allows(&self, role: &Role, action_key: &str) -> bool {
        self.grants
            .get(role)
            .and_then(|actions| actions.get(action_key))
            .copied()
            .unwrap_or(false)
    }

    /// The raw mapping for one role
    pub fn role_grants(&self, role: &Role) -> Option<&HashMap<String, bool>> {
        self.grants.get(role)
    }

    /// Roles that have an entry (every known role, plus any extra role seen in rows)
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.grants.keys()
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::empty()
    }
}
