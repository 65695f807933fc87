//! User accounts
//!
//! Users log in with their email. Authorization never looks at the user's
//! own role hint or legacy organisation pointer; memberships decide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::patch::double_option;

/// Legacy account-level role, kept for display only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRoleHint {
    Owner,
    Admin,
    #[default]
    User,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Login handle, unique case-insensitively
    pub email: String,

    /// Mirrors the email at signup
    pub username: String,

    /// Argon2 PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    #[serde(default)]
    pub phone: String,

    /// Storage key of the avatar image
    #[serde(default)]
    pub avatar: Option<String>,

    /// Legacy role hint
    #[serde(default)]
    pub role: UserRoleHint,

    /// Legacy single-organisation pointer, read-only
    #[serde(default)]
    pub organisation_id: Option<Uuid>,

    #[serde(default)]
    pub is_staff: bool,

    #[serde(default)]
    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with an already hashed password.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            id: Uuid::now_v7(),
            username: email.clone(),
            email,
            password_hash: password_hash.into(),
            phone: String::new(),
            avatar: None,
            role: UserRoleHint::User,
            organisation_id: None,
            is_staff: false,
            is_superuser: false,
            created_at: Utc::now(),
        }
    }

    /// Mark the user as platform staff.
    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }

    /// Staff and superusers skip membership checks.
    pub fn is_privileged(&self) -> bool {
        self.is_staff || self.is_superuser
    }

    /// Lookup key for the email.
    pub fn email_key(&self) -> String {
        normalize_email(&self.email)
    }

    /// Apply a profile update.
    pub fn apply(&mut self, changes: ProfileChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(phone) = changes.phone {
            self.phone = phone;
        }
        if let Some(avatar) = changes.avatar {
            self.avatar = avatar;
        }
    }
}

/// Case-insensitive email lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Editable profile fields.
///
/// Role, organisation pointer and creation date are read-only and have no
/// counterpart here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileChanges {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub avatar: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("Alice@Example.com", "hash");
        assert_eq!(user.username, "Alice@Example.com");
        assert_eq!(user.email_key(), "alice@example.com");
        assert_eq!(user.role, UserRoleHint::User);
        assert!(!user.is_privileged());
        assert!(User::new("s@example.com", "hash").staff().is_privileged());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("alice@example.com", "secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }

    #[test]
    fn test_profile_changes() {
        let mut user = User::new("alice@example.com", "hash");
        user.avatar = Some("avatars/a.png".to_string());

        let changes: ProfileChanges =
            serde_json::from_str(r#"{"phone": "+351 900", "avatar": null}"#).unwrap();
        user.apply(changes);

        assert_eq!(user.phone, "+351 900");
        assert!(user.avatar.is_none());
        assert_eq!(user.username, "alice@example.com");
    }
}
