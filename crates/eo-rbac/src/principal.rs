//! Authenticated callers

use eo_org::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity an operation runs as.
///
/// Staff and superusers bypass membership checks wherever the gate is
/// evaluated, but are not granted visibility into every organisation in
/// caller-facing listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Principal {
    /// A regular user.
    pub fn user(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_staff: false,
            is_superuser: false,
        }
    }

    /// A staff user.
    pub fn staff(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_staff: true,
            is_superuser: false,
        }
    }

    /// Check if the caller skips membership checks.
    pub fn bypasses_membership(&self) -> bool {
        self.is_staff || self.is_superuser
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_from_user() {
        let mut user = User::new("a@example.com", "hash");
        assert!(!Principal::from(&user).bypasses_membership());

        user.is_superuser = true;
        let principal = Principal::from(&user);
        assert_eq!(principal.user_id, user.id);
        assert!(principal.bypasses_membership());
        assert!(Principal::staff(Uuid::now_v7()).bypasses_membership());
    }
}
