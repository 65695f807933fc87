//! # Authorization Gate
//!
//! The per-request policy for organisation-scoped resources:
//!
//! - safe actions are always allowed; result sets are scoped by the caller's
//!   memberships before they reach the gate
//! - writes need staff/superuser, or an owner/admin membership in the
//!   resource's organisation
//! - writes on a resource without an organisation are denied

use async_trait::async_trait;
use eo_org::OrganisationRole;
use uuid::Uuid;

use crate::actions::Action;
use crate::principal::Principal;
use crate::resources::ResourceRef;

/// Source of membership roles, usually the membership registry.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    type Error: Send;

    /// Role of `user_id` in `organisation_id`, if any.
    async fn role_of(
        &self,
        user_id: Uuid,
        organisation_id: Uuid,
    ) -> Result<Option<OrganisationRole>, Self::Error>;
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The caller holds no membership in the organisation.
    NotMember,
    /// The caller is a member without owner/admin rights.
    InsufficientRole,
    /// The resource has no owning organisation.
    Unscoped,
}

/// Outcome of a gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Stateless policy evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Evaluate with an already resolved role.
    ///
    /// # Example
    ///
    /// ```
    /// use eo_org::OrganisationRole;
    /// use eo_rbac::{Action, AuthorizationGate, Decision, DenyReason, Principal, ResourceKind, ResourceRef};
    /// use uuid::Uuid;
    ///
    /// let caller = Principal::user(Uuid::now_v7());
    /// let post = ResourceRef::in_organisation(ResourceKind::Publication, Uuid::now_v7());
    ///
    /// assert_eq!(
    ///     AuthorizationGate::evaluate(&caller, Action::Update, &post, Some(OrganisationRole::Member)),
    ///     Decision::Deny(DenyReason::InsufficientRole),
    /// );
    /// assert!(AuthorizationGate::evaluate(&caller, Action::Update, &post, Some(OrganisationRole::Admin)).is_allowed());
    /// ```
    pub fn evaluate(
        principal: &Principal,
        action: Action,
        resource: &ResourceRef,
        role: Option<OrganisationRole>,
    ) -> Decision {
        if action.is_safe() {
            return Decision::Allow;
        }
        if resource.organisation_id.is_none() {
            return Decision::Deny(DenyReason::Unscoped);
        }
        if principal.bypasses_membership() {
            return Decision::Allow;
        }
        match role {
            Some(role) if role.is_admin_or_owner() => Decision::Allow,
            Some(_) => Decision::Deny(DenyReason::InsufficientRole),
            None => Decision::Deny(DenyReason::NotMember),
        }
    }

    /// Evaluate, looking the role up in `source` when one is needed.
    pub async fn authorize<S>(
        source: &S,
        principal: &Principal,
        action: Action,
        resource: &ResourceRef,
    ) -> Result<Decision, S::Error>
    where
        S: MembershipSource + ?Sized,
    {
        let role = match resource.organisation_id {
            Some(organisation_id) if action.is_write() && !principal.bypasses_membership() => {
                source.role_of(principal.user_id, organisation_id).await?
            }
            _ => None,
        };
        Ok(Self::evaluate(principal, action, resource, role))
    }

    /// Whether the caller may see drafts and archived items of an organisation.
    pub fn can_see_unpublished(principal: &Principal, role: Option<OrganisationRole>) -> bool {
        principal.bypasses_membership() || role.map_or(false, |r| r.can_see_unpublished())
    }
}
