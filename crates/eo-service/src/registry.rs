//! Membership Registry
//!
//! The single source of truth for "what role does this user hold in this
//! organisation". Every authorization check goes through [`MembershipRegistry::role_of`],
//! and inviting is an idempotent upsert keyed by (user, organisation).

use async_trait::async_trait;
use eo_events::{EventBus, MembershipEvent};
use eo_org::{Membership, MembershipView, OrganisationRole, ValidationErrors};
use eo_rbac::{Action, AuthorizationGate, Decision, DenyReason, MembershipSource, Principal, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::cleanup::announce;
use crate::error::{ServiceError, ServiceResult};
use crate::query::OrganisationRef;
use crate::store::Store;

/// Invitation payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InviteMembership {
    #[serde(default)]
    pub organisation: Option<Uuid>,

    /// Email of an existing user, matched case-insensitively
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub role: Option<OrganisationRole>,
}

impl InviteMembership {
    pub fn new(organisation: Uuid, email: impl Into<String>, role: OrganisationRole) -> Self {
        Self {
            organisation: Some(organisation),
            email: email.into(),
            role: Some(role),
        }
    }
}

/// Result of an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteOutcome {
    pub membership: MembershipView,
    /// A new membership was created rather than a role overwritten
    pub created: bool,
}

/// Membership lookups, invitations and role management.
#[derive(Clone)]
pub struct MembershipRegistry {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
}

impl MembershipRegistry {
    pub fn new(store: Arc<dyn Store>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Role of `user_id` in `organisation_id`, if any.
    pub async fn role_of(&self, user_id: Uuid, organisation_id: Uuid) -> ServiceResult<Option<OrganisationRole>> {
        Ok(self.store.role_of(user_id, organisation_id).await?)
    }

    pub async fn is_admin_or_owner(&self, user_id: Uuid, organisation_id: Uuid) -> ServiceResult<bool> {
        Ok(self
            .role_of(user_id, organisation_id)
            .await?
            .map_or(false, |role| role.is_admin_or_owner()))
    }

    /// The user's "current" membership: earliest created, then smallest id.
    pub async fn current(&self, user_id: Uuid) -> ServiceResult<Option<Membership>> {
        let memberships = self.store.memberships_of_user(user_id).await?;
        Ok(Membership::current(&memberships).cloned())
    }

    /// Ids of every organisation the user belongs to.
    pub async fn organisation_ids_of(&self, user_id: Uuid) -> ServiceResult<Vec<Uuid>> {
        let memberships = self.store.memberships_of_user(user_id).await?;
        Ok(memberships.into_iter().map(|m| m.organisation_id).collect())
    }

    /// Memberships of every organisation the caller belongs to, newest first.
    ///
    /// An organisation filter outside the caller's organisations yields an
    /// empty list.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list(
        &self,
        caller: &Principal,
        organisation: Option<&OrganisationRef>,
    ) -> ServiceResult<Vec<MembershipView>> {
        let mut organisation_ids = self.organisation_ids_of(caller.user_id).await?;

        if let Some(filter) = organisation {
            let wanted = match filter {
                OrganisationRef::Id(id) => Some(*id),
                OrganisationRef::Slug(slug) => self.store.get_organisation_by_slug(slug).await?.map(|o| o.id),
            };
            organisation_ids.retain(|id| Some(*id) == wanted);
        }

        let memberships = self.store.memberships_in(&organisation_ids).await?;
        let mut views = Vec::with_capacity(memberships.len());
        for membership in &memberships {
            views.push(self.view(membership).await?);
        }
        Ok(views)
    }

    /// Invite an existing user, or change the role they already hold.
    #[instrument(skip(self, caller, invite), fields(user_id = %caller.user_id))]
    pub async fn invite(&self, caller: &Principal, invite: InviteMembership) -> ServiceResult<InviteOutcome> {
        let mut errors = ValidationErrors::new();
        if invite.organisation.is_none() {
            errors.add("organisation", "this field is required");
        }
        if invite.email.trim().is_empty() {
            errors.add("email", "this field is required");
        }
        errors.into_result()?;

        let organisation_id = invite
            .organisation
            .ok_or_else(|| ServiceError::field("organisation", "this field is required"))?;
        let organisation = self
            .store
            .get_organisation(organisation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("organisation {}", organisation_id)))?;

        // Authorize before resolving the invitee
        let resource = ResourceRef::in_organisation(ResourceKind::Membership, organisation.id);
        let decision = AuthorizationGate::authorize(self, caller, Action::Create, &resource).await?;
        ensure_allowed(decision)?;

        let invitee = self
            .store
            .find_user_by_email(&invite.email)
            .await?
            .ok_or_else(|| ServiceError::field("email", "no user is registered with this email"))?;

        let role = invite.role.unwrap_or(OrganisationRole::Member);
        let upsert = self
            .store
            .upsert_membership(organisation.id, invitee.id, role, Some(caller.user_id))
            .await?;

        tracing::info!(
            organisation_id = %organisation.id,
            invitee_id = %invitee.id,
            role = %role,
            created = upsert.created,
            "Membership upserted"
        );
        self.announce_upsert(&upsert.membership, upsert.created).await;

        Ok(InviteOutcome {
            membership: self.view(&upsert.membership).await?,
            created: upsert.created,
        })
    }

    /// Change the role of an existing membership.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn update_role(
        &self,
        caller: &Principal,
        membership_id: Uuid,
        role: OrganisationRole,
    ) -> ServiceResult<MembershipView> {
        let mut membership = self.visible_membership(caller, membership_id).await?;
        self.authorize_existing(caller, Action::Update, ResourceKind::Membership, membership.organisation_id)
            .await?;

        membership.role = role;
        let membership = self.store.update_membership(membership).await?;
        tracing::info!(membership_id = %membership.id, role = %role, "Membership role changed");
        self.announce_upsert(&membership, false).await;

        self.view(&membership).await
    }

    /// Delete a membership.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn remove(&self, caller: &Principal, membership_id: Uuid) -> ServiceResult<()> {
        let membership = self.visible_membership(caller, membership_id).await?;
        self.authorize_existing(caller, Action::Delete, ResourceKind::Membership, membership.organisation_id)
            .await?;

        self.store.delete_membership(membership.id).await?;
        tracing::info!(membership_id = %membership.id, organisation_id = %membership.organisation_id, "Membership removed");
        announce(
            self.bus.as_ref(),
            MembershipEvent::Removed {
                membership_id: membership.id,
                organisation_id: membership.organisation_id,
                user_id: membership.user_id,
            }
            .to_event(),
        )
        .await;
        Ok(())
    }

    /// Caller's role in an organisation they can see.
    ///
    /// Fails with not-found when the caller holds no membership there; this
    /// applies to staff as well.
    pub(crate) async fn visible_role(
        &self,
        caller: &Principal,
        organisation_id: Uuid,
        what: &str,
    ) -> ServiceResult<OrganisationRole> {
        self.role_of(caller.user_id, organisation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(what.to_string()))
    }

    /// Run the gate for a write on an existing, visible resource.
    pub(crate) async fn authorize_existing(
        &self,
        caller: &Principal,
        action: Action,
        kind: ResourceKind,
        organisation_id: Uuid,
    ) -> ServiceResult<OrganisationRole> {
        let role = self.visible_role(caller, organisation_id, kind.as_str()).await?;
        let resource = ResourceRef::in_organisation(kind, organisation_id);
        ensure_allowed(AuthorizationGate::evaluate(caller, action, &resource, Some(role)))?;
        Ok(role)
    }

    async fn visible_membership(&self, caller: &Principal, membership_id: Uuid) -> ServiceResult<Membership> {
        let membership = self
            .store
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("membership {}", membership_id)))?;
        self.visible_role(caller, membership.organisation_id, "membership")
            .await?;
        Ok(membership)
    }

    async fn view(&self, membership: &Membership) -> ServiceResult<MembershipView> {
        let organisation_slug = self
            .store
            .get_organisation(membership.organisation_id)
            .await?
            .map(|o| o.slug)
            .unwrap_or_default();
        let user_email = self
            .store
            .get_user(membership.user_id)
            .await?
            .map(|u| u.email)
            .unwrap_or_default();

        Ok(MembershipView {
            id: membership.id,
            organisation_id: membership.organisation_id,
            organisation_slug,
            user_id: membership.user_id,
            user_email,
            role: membership.role,
            created_at: membership.created_at,
        })
    }

    async fn announce_upsert(&self, membership: &Membership, created: bool) {
        announce(
            self.bus.as_ref(),
            MembershipEvent::Upserted {
                membership_id: membership.id,
                organisation_id: membership.organisation_id,
                user_id: membership.user_id,
                role: membership.role,
                created,
            }
            .to_event(),
        )
        .await;
    }
}

#[async_trait]
impl MembershipSource for MembershipRegistry {
    type Error = ServiceError;

    async fn role_of(&self, user_id: Uuid, organisation_id: Uuid) -> Result<Option<OrganisationRole>, ServiceError> {
        MembershipRegistry::role_of(self, user_id, organisation_id).await
    }
}

/// Turn a gate decision into a result.
pub(crate) fn ensure_allowed(decision: Decision) -> ServiceResult<()> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::Deny(DenyReason::NotMember) => {
            Err(ServiceError::denied("you are not a member of this organisation"))
        }
        Decision::Deny(DenyReason::InsufficientRole) => {
            Err(ServiceError::denied("an owner or admin role is required"))
        }
        Decision::Deny(DenyReason::Unscoped) => Err(ServiceError::denied("resource has no organisation")),
    }
}
