//! # Actions
//!
//! Operations a caller can attempt on an organisation-scoped resource.

use serde::{Deserialize, Serialize};

/// Actions that can be performed on resources.
///
/// - **Read**: View one resource
/// - **List**: Browse a scoped collection
/// - **Create**: Create a new resource inside an organisation
/// - **Update**: Modify an existing resource
/// - **Delete**: Remove an existing resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read/view resource.
    Read,

    /// List/query resources.
    List,

    /// Create new resource.
    Create,

    /// Update existing resource.
    Update,

    /// Delete resource.
    Delete,
}

impl Action {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::List => "list",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Parse action from string representation.
    ///
    /// Accepts HTTP method names as aliases.
    ///
    /// # Example
    ///
    /// ```
    /// use eo_rbac::actions::Action;
    ///
    /// assert_eq!(Action::parse("read"), Some(Action::Read));
    /// assert_eq!(Action::parse("PATCH"), Some(Action::Update));
    /// assert_eq!(Action::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" | "view" | "get" | "head" | "options" => Some(Action::Read),
            "list" | "search" => Some(Action::List),
            "create" | "add" | "post" => Some(Action::Create),
            "update" | "edit" | "put" | "patch" => Some(Action::Update),
            "delete" | "remove" => Some(Action::Delete),
            _ => None,
        }
    }

    /// Get all actions.
    pub fn all() -> Vec<Self> {
        vec![
            Action::Read,
            Action::List,
            Action::Create,
            Action::Update,
            Action::Delete,
        ]
    }

    /// Check if this is a safe (read-only) action.
    pub fn is_safe(&self) -> bool {
        matches!(self, Action::Read | Action::List)
    }

    /// Check if this action modifies data.
    pub fn is_write(&self) -> bool {
        !self.is_safe()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        assert_eq!(Action::parse("get"), Some(Action::Read));
        assert_eq!(Action::parse("search"), Some(Action::List));
        assert_eq!(Action::parse("POST"), Some(Action::Create));
        assert_eq!(Action::parse("put"), Some(Action::Update));
        assert_eq!(Action::parse("remove"), Some(Action::Delete));
        assert_eq!(Action::parse("manage"), None);
    }

    #[test]
    fn test_safe_and_write_partition() {
        for action in Action::all() {
            assert_ne!(action.is_safe(), action.is_write(), "{}", action);
        }
        assert!(Action::List.is_safe());
        assert!(Action::Create.is_write());
    }
}
