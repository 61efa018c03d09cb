//! Action registry
//!
//! Canonical list of guardable capabilities. `key` is the machine key stored in
//! the `role_permissions.action_key` column; `label` and `section` drive the
//! permission editor UI. The set is fixed at build time.

use super::permission::PermissionMatrix;
use super::role::Role;

/// A named capability the admin surface enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub key: &'static str,
    pub label: &'static str,
    pub section: &'static str,
}

const fn action(key: &'static str, label: &'static str, section: &'static str) -> Action {
    Action {
        key,
        label,
        section,
    }
}

pub const ACTIONS: &[Action] = &[
    // Users
    action("users.view", "View users", "Users"),
    action("users.create", "Create users", "Users"),
    action("users.edit", "Edit users", "Users"),
    action("users.delete", "Delete users", "Users"),
    action("users.invite", "Invite users (email link)", "Users"),
    action("users.reset_password", "Reset passwords", "Users"),
    // Events
    action("events.view", "View events", "Events"),
    action("events.create", "Create events", "Events"),
    action("events.edit", "Edit events", "Events"),
    action("events.delete", "Delete events", "Events"),
    action("events.publish", "Publish events", "Events"),
    // Media
    action("media.view", "View media library", "Media"),
    action("media.upload", "Upload media", "Media"),
    action("media.delete", "Delete media", "Media"),
    // Site settings
    action("site_settings.view", "View site settings", "Site Settings"),
    action("site_settings.edit", "Edit site settings", "Site Settings"),
    // Platform
    action("logs.view", "View audit logs", "Platform"),
    action("schema.view", "View schema inspector", "Platform"),
    action("dashboard.view", "View dashboard", "Platform"),
    // Food trucks
    action("food_trucks.view", "View food trucks", "Food Trucks"),
    action("food_trucks.create", "Create food trucks", "Food Trucks"),
    action("food_trucks.edit", "Edit food trucks", "Food Trucks"),
    action("food_trucks.delete", "Delete food trucks", "Food Trucks"),
];

/// Look up an action by key
pub fn find_action(key: &str) -> Option<&'static Action> {
    ACTIONS.iter().find(|a| a.key == key)
}

/// Whether a key belongs to the registry
pub fn is_known_action(key: &str) -> bool {
    find_action(key).is_some()
}

/// Actions grouped by section, in registry order
pub fn actions_by_section() -> Vec<(&'static str, Vec<&'static Action>)> {
    let mut groups: Vec<(&'static str, Vec<&'static Action>)> = Vec::new();
    for a in ACTIONS {
        match groups.iter_mut().find(|(section, _)| *section == a.section) {
            Some((_, list)) => list.push(a),
            None => groups.push((a.section, vec![a])),
        }
    }
    groups
}

/// One line per granted action (`"Section: Label"`), in registry order
pub fn summarize_role_capabilities(role: &Role, matrix: &PermissionMatrix) -> String {
    let allowed: Vec<String> = ACTIONS
        .iter()
        .filter(|a| matrix.allows(role, a.key))
        .map(|a| format!("{}: {}", a.section, a.label))
        .collect();

    if allowed.is_empty() {
        return "No special permissions (read-only)".to_string();
    }
    allowed.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::permission::PermissionRow;

    #[test]
    fn test_keys_are_unique() {
        for (i, a) in ACTIONS.iter().enumerate() {
            assert!(
                ACTIONS[i + 1..].iter().all(|b| b.key != a.key),
                "duplicate key {}",
                a.key
            );
        }
    }

    #[test]
    fn test_sections_keep_registry_order() {
        let sections: Vec<&str> = actions_by_section().iter().map(|(s, _)| *s).collect();
        assert_eq!(
            sections,
            vec!["Users", "Events", "Media", "Site Settings", "Platform", "Food Trucks"]
        );
    }

    #[test]
    fn test_summary_lists_granted_actions() {
        let matrix = PermissionMatrix::from_rows(vec![
            PermissionRow::new("staff", "media.upload", true),
            PermissionRow::new("staff", "events.view", true),
            PermissionRow::new("staff", "events.delete", false),
        ]);

        let summary = summarize_role_capabilities(&Role::Staff, &matrix);
        assert_eq!(summary, "Events: View events\nMedia: Upload media");
    }

    #[test]
    fn test_summary_for_role_without_grants() {
        let matrix = PermissionMatrix::from_rows(Vec::new());
        assert_eq!(
            summarize_role_capabilities(&Role::Viewer, &matrix),
            "No special permissions (read-only)"
        );
    }
}
