//! Organisation roles
//!
//! This module defines the closed set of roles a user can hold inside an
//! organisation. Authorization checks match on these variants exhaustively.

use serde::{Deserialize, Serialize};

/// User role within an organisation.
///
/// Owner and Admin are equivalent for every write check; Member is read-only.
/// The ordering is: Member < Admin < Owner
///
/// # Permission Model
///
/// - **Member**: Sees published content of the organisation
/// - **Admin**: Publishes content, manages members and the subscription
/// - **Owner**: Same rights as Admin; granted to the organisation creator
///
/// # Examples
///
/// ```
/// use eo_org::OrganisationRole;
///
/// assert!(OrganisationRole::Admin.is_admin_or_owner());
/// assert!(!OrganisationRole::Member.is_admin_or_owner());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrganisationRole {
    /// Read-only access to published content
    Member = 1,

    /// Can publish content and manage members
    Admin = 2,

    /// Organisation creator
    Owner = 3,
}

impl OrganisationRole {
    /// Check if this role grants write access to organisation resources.
    ///
    /// # Returns
    ///
    /// `true` for Admin and Owner roles
    pub fn is_admin_or_owner(&self) -> bool {
        match self {
            Self::Owner | Self::Admin => true,
            Self::Member => false,
        }
    }

    /// Check if this role can see drafts and archived publications.
    pub fn can_see_unpublished(&self) -> bool {
        self.is_admin_or_owner()
    }

    /// Parse role from string representation.
    ///
    /// # Arguments
    ///
    /// * `s` - String to parse (case-insensitive)
    ///
    /// # Returns
    ///
    /// `Some(OrganisationRole)` if valid, `None` otherwise
    ///
    /// # Examples
    ///
    /// ```
    /// use eo_org::OrganisationRole;
    ///
    /// assert_eq!(OrganisationRole::parse("admin"), Some(OrganisationRole::Admin));
    /// assert_eq!(OrganisationRole::parse("OWNER"), Some(OrganisationRole::Owner));
    /// assert_eq!(OrganisationRole::parse("adimn"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Admin => "Admin",
            Self::Owner => "Owner",
        }
    }
}

impl Default for OrganisationRole {
    fn default() -> Self {
        Self::Member
    }
}

impl std::fmt::Display for OrganisationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
