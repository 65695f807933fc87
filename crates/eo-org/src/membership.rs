//! Membership domain models
//!
//! This module provides the membership entity linking a user to an
//! organisation. A membership is the single source of truth for what a user
//! may do inside an organisation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::OrganisationRole;

/// Organisation membership linking a user to an organisation.
///
/// At most one membership exists per (user, organisation) pair; inviting a
/// user again overwrites the role of the existing membership.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use eo_org::{Membership, OrganisationRole};
///
/// let org_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let membership = Membership::new(org_id, user_id, OrganisationRole::Member);
/// assert!(!membership.role.is_admin_or_owner());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Organisation ID
    pub organisation_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the organisation
    pub role: OrganisationRole,

    /// When the membership was created
    pub created_at: DateTime<Utc>,

    /// Who invited this user (if applicable)
    pub invited_by: Option<Uuid>,
}

impl Membership {
    /// Creates a new membership.
    ///
    /// # Arguments
    ///
    /// * `organisation_id` - The organisation ID
    /// * `user_id` - The user ID
    /// * `role` - The user's role in the organisation
    pub fn new(organisation_id: Uuid, user_id: Uuid, role: OrganisationRole) -> Self {
        Self {
            id: Uuid::now_v7(),
            organisation_id,
            user_id,
            role,
            created_at: Utc::now(),
            invited_by: None,
        }
    }

    /// Set who invited this user.
    pub fn with_inviter(mut self, inviter_id: Uuid) -> Self {
        self.invited_by = Some(inviter_id);
        self
    }

    /// Pick the "current" membership among several belonging to one user.
    ///
    /// The earliest created membership wins; ties fall back to the smallest
    /// membership ID so the choice never depends on storage order.
    ///
    /// # Examples
    ///
    /// ```
    /// use uuid::Uuid;
    /// use eo_org::{Membership, OrganisationRole};
    ///
    /// let user = Uuid::now_v7();
    /// let first = Membership::new(Uuid::now_v7(), user, OrganisationRole::Owner);
    /// let second = Membership::new(Uuid::now_v7(), user, OrganisationRole::Member);
    ///
    /// let all = vec![second.clone(), first.clone()];
    /// assert_eq!(Membership::current(&all).map(|m| m.id), Some(first.id));
    /// ```
    pub fn current(memberships: &[Membership]) -> Option<&Membership> {
        memberships
            .iter()
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
    }
}

/// Membership projection with the related user email and organisation slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipView {
    pub id: Uuid,
    pub organisation_id: Uuid,
    pub organisation_slug: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub role: OrganisationRole,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_membership_creation() {
        let org_id = Uuid::now_v7();
        let user_id = Uuid::now_v7();
        let membership = Membership::new(org_id, user_id, OrganisationRole::Admin);

        assert_eq!(membership.organisation_id, org_id);
        assert_eq!(membership.user_id, user_id);
        assert_eq!(membership.role, OrganisationRole::Admin);
        assert!(membership.invited_by.is_none());
    }

    #[test]
    fn test_membership_with_inviter() {
        let inviter_id = Uuid::now_v7();
        let membership = Membership::new(Uuid::now_v7(), Uuid::now_v7(), OrganisationRole::Member)
            .with_inviter(inviter_id);

        assert_eq!(membership.invited_by, Some(inviter_id));
    }

    #[test]
    fn test_current_prefers_earliest_then_smallest_id() {
        let user = Uuid::now_v7();
        let now = Utc::now();

        let mut older = Membership::new(Uuid::now_v7(), user, OrganisationRole::Member);
        older.created_at = now - Duration::days(2);
        let mut newer = Membership::new(Uuid::now_v7(), user, OrganisationRole::Owner);
        newer.created_at = now;

        let all = vec![newer.clone(), older.clone()];
        assert_eq!(Membership::current(&all).map(|m| m.id), Some(older.id));

        let mut twin = older.clone();
        twin.id = Uuid::nil();
        let all = vec![older.clone(), twin.clone()];
        assert_eq!(Membership::current(&all).map(|m| m.id), Some(Uuid::nil()));

        assert!(Membership::current(&[]).is_none());
    }
}
