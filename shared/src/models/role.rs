//! Role Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Admin role (RBAC role), ordered by privilege rank
///
/// Role names come from the remote `admin_users` table. Names that are not one
/// of the five known roles are kept verbatim in [`Role::Other`] and rank lowest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Staff,
    Viewer,
    Other(String),
}

impl Role {
    /// The known roles, most privileged first
    pub fn known() -> [Role; 5] {
        [
            Role::SuperAdmin,
            Role::Admin,
            Role::Manager,
            Role::Staff,
            Role::Viewer,
        ]
    }

    /// Parse a role name (case-insensitive, surrounding whitespace ignored)
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "super_admin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "staff" => Role::Staff,
            "viewer" => Role::Viewer,
            _ => Role::Other(name.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Viewer => "viewer",
            Role::Other(name) => name,
        }
    }

    /// Privilege rank: 5 (super admin) down to 1 (viewer), 0 for unknown roles
    ///
    /// Only used to restrict which roles an actor may assign, never to
    /// authorize actions.
    pub fn rank(&self) -> u8 {
        match self {
            Role::SuperAdmin => 5,
            Role::Admin => 4,
            Role::Manager => 3,
            Role::Staff => 2,
            Role::Viewer => 1,
            Role::Other(_) => 0,
        }
    }

    /// The top rank bypasses the permission matrix entirely
    pub fn is_top_rank(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Human label for role pickers
    pub fn label(&self) -> &str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Staff => "Staff",
            Role::Viewer => "Viewer",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::parse(value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One choice in a role picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleOption {
    pub role: Role,
    pub disabled: bool,
}

impl RoleOption {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            disabled: false,
        }
    }
}
