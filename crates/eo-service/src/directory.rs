//! Organisation Directory
//!
//! Creating an organisation provisions its trial subscription and the
//! creator's owner membership in the same storage call. Organisations are
//! addressed by slug.

use eo_events::{EventBus, OrganisationEvent};
use eo_org::{
    Membership, NewOrganisation, Organisation, OrganisationChanges, OrganisationRole, Subscription,
    SubscriptionPatch, SubscriptionSummary,
};
use eo_rbac::{Action, Principal, ResourceKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use crate::cleanup::{announce, release_files};
use crate::error::{ServiceError, ServiceResult};
use crate::registry::MembershipRegistry;
use crate::store::Store;

/// An organisation with its subscription state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganisationDetail {
    #[serde(flatten)]
    pub organisation: Organisation,
    pub subscription: Option<SubscriptionSummary>,
}

/// Organisation lifecycle and subscription management.
#[derive(Clone)]
pub struct OrganisationDirectory {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    registry: MembershipRegistry,
    default_trial_days: u32,
}

impl OrganisationDirectory {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        registry: MembershipRegistry,
        default_trial_days: u32,
    ) -> Self {
        Self {
            store,
            bus,
            registry,
            default_trial_days,
        }
    }

    /// Create an organisation owned by the caller.
    ///
    /// # Errors
    ///
    /// A field error on `slug` when the derived or given slug is taken, or on
    /// `trial_days` when the trial is longer than allowed.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id, name = %input.name))]
    pub async fn create(&self, caller: &Principal, input: NewOrganisation) -> ServiceResult<OrganisationDetail> {
        let organisation = input.into_organisation(Some(caller.user_id), self.default_trial_days)?;
        let subscription = Subscription::provision(&organisation)?;
        let owner = Membership::new(organisation.id, caller.user_id, OrganisationRole::Owner);

        let provisioned = self
            .store
            .provision_organisation(organisation, subscription, Some(owner))
            .await?;
        let organisation = provisioned.organisation;

        tracing::info!(
            organisation_id = %organisation.id,
            slug = %organisation.slug,
            trial_days = organisation.trial_days,
            "Organisation created"
        );
        announce(
            self.bus.as_ref(),
            OrganisationEvent::Created {
                organisation_id: organisation.id,
                slug: organisation.slug.clone(),
                created_by: organisation.created_by,
                trial_end: provisioned.subscription.trial_end,
            }
            .to_event(),
        )
        .await;

        Ok(OrganisationDetail {
            organisation,
            subscription: Some(provisioned.subscription.summary()),
        })
    }

    /// Organisation by slug, if the caller belongs to it.
    pub async fn retrieve_by_slug(&self, caller: &Principal, slug: &str) -> ServiceResult<OrganisationDetail> {
        let organisation = self.visible(caller, slug).await?;
        self.detail(organisation).await
    }

    /// Organisations the caller holds a membership in, by name.
    ///
    /// Staff see only their own organisations here; see [`Self::list_all`].
    pub async fn list_mine(&self, caller: &Principal) -> ServiceResult<Vec<OrganisationDetail>> {
        let organisations = self.store.organisations_of_user(caller.user_id).await?;
        self.details(organisations).await
    }

    /// Every organisation; staff and superusers only.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn list_all(&self, caller: &Principal) -> ServiceResult<Vec<OrganisationDetail>> {
        if !caller.bypasses_membership() {
            return Err(ServiceError::denied("staff access required"));
        }
        let organisations = self.store.all_organisations().await?;
        self.details(organisations).await
    }

    #[instrument(skip(self, caller, changes), fields(user_id = %caller.user_id))]
    pub async fn update(
        &self,
        caller: &Principal,
        slug: &str,
        changes: OrganisationChanges,
    ) -> ServiceResult<OrganisationDetail> {
        let mut organisation = self.visible(caller, slug).await?;
        self.registry
            .authorize_existing(caller, Action::Update, ResourceKind::Organisation, organisation.id)
            .await?;

        organisation.apply(changes)?;
        let organisation = self.store.update_organisation(organisation).await?;
        tracing::info!(organisation_id = %organisation.id, "Organisation updated");
        self.detail(organisation).await
    }

    /// Delete an organisation and everything it owns.
    ///
    /// Stored attachment files are released after the delete commits.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn delete(&self, caller: &Principal, slug: &str) -> ServiceResult<()> {
        let organisation = self.visible(caller, slug).await?;
        self.registry
            .authorize_existing(caller, Action::Delete, ResourceKind::Organisation, organisation.id)
            .await?;

        let report = self.store.delete_organisation(organisation.id).await?;
        tracing::info!(
            organisation_id = %organisation.id,
            publications = report.publications,
            memberships = report.memberships,
            files = report.released_files.len(),
            "Organisation deleted"
        );

        announce(
            self.bus.as_ref(),
            OrganisationEvent::Deleted {
                organisation_id: organisation.id,
                slug: organisation.slug.clone(),
                released_files: report.released_files.len(),
            }
            .to_event(),
        )
        .await;
        release_files(self.bus.as_ref(), Some(organisation.id), report.released_files).await;
        Ok(())
    }

    pub async fn get_subscription(&self, caller: &Principal, slug: &str) -> ServiceResult<Subscription> {
        let organisation = self.visible(caller, slug).await?;
        self.subscription_of(&organisation).await
    }

    /// Patch the subscription. The owning organisation cannot be changed.
    #[instrument(skip(self, caller, patch), fields(user_id = %caller.user_id))]
    pub async fn update_subscription(
        &self,
        caller: &Principal,
        slug: &str,
        patch: SubscriptionPatch,
    ) -> ServiceResult<Subscription> {
        let organisation = self.visible(caller, slug).await?;
        self.registry
            .authorize_existing(caller, Action::Update, ResourceKind::Subscription, organisation.id)
            .await?;

        let mut subscription = self.subscription_of(&organisation).await?;
        subscription.apply(patch)?;
        let subscription = self.store.update_subscription(subscription).await?;
        tracing::info!(
            organisation_id = %organisation.id,
            status = subscription.status.as_str(),
            "Subscription updated"
        );
        Ok(subscription)
    }

    async fn visible(&self, caller: &Principal, slug: &str) -> ServiceResult<Organisation> {
        let not_found = || ServiceError::not_found(format!("organisation {}", slug));
        let organisation = self
            .store
            .get_organisation_by_slug(slug)
            .await?
            .ok_or_else(not_found)?;
        if self.registry.role_of(caller.user_id, organisation.id).await?.is_none() {
            return Err(not_found());
        }
        Ok(organisation)
    }

    async fn subscription_of(&self, organisation: &Organisation) -> ServiceResult<Subscription> {
        self.store
            .get_subscription(organisation.id)
            .await?
            .ok_or_else(|| ServiceError::Internal(format!("organisation {} has no subscription", organisation.id)))
    }

    async fn detail(&self, organisation: Organisation) -> ServiceResult<OrganisationDetail> {
        let subscription = self.store.get_subscription(organisation.id).await?;
        Ok(OrganisationDetail {
            organisation,
            subscription: subscription.map(|s| s.summary()),
        })
    }

    async fn details(&self, organisations: Vec<Organisation>) -> ServiceResult<Vec<OrganisationDetail>> {
        let mut details = Vec::with_capacity(organisations.len());
        for organisation in organisations {
            details.push(self.detail(organisation).await?);
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use eo_events::MemoryEventBus;
    use eo_org::{SubscriptionStatus, User, MAX_TRIAL_DAYS};

    async fn directory() -> (OrganisationDirectory, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let bus: Arc<dyn EventBus> = Arc::new(MemoryEventBus::inline());
        let registry = MembershipRegistry::new(store.clone(), bus.clone());
        (OrganisationDirectory::new(store.clone(), bus, registry, 90), store)
    }

    #[tokio::test]
    async fn test_create_provisions_owner_and_trial() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let caller = Principal::from(&user);

        let detail = directory
            .create(&caller, NewOrganisation::named("Acme Corp").with_trial_days(30))
            .await
            .unwrap();
        let org = &detail.organisation;

        assert_eq!(org.slug, "acme-corp");
        assert_eq!(
            store.role_of(user.id, org.id).await.unwrap(),
            Some(OrganisationRole::Owner)
        );
        let sub = directory.get_subscription(&caller, "acme-corp").await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert_eq!(sub.trial_end, Some(org.created_at + chrono::Duration::days(30)));
    }

    #[tokio::test]
    async fn test_default_trial_days_apply() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let detail = directory
            .create(&Principal::from(&user), NewOrganisation::named("Acme"))
            .await
            .unwrap();
        assert_eq!(detail.organisation.trial_days, 90);
    }

    #[tokio::test]
    async fn test_oversized_trial_is_field_error() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let caller = Principal::from(&user);

        let err = directory
            .create(&caller, NewOrganisation::named("Acme").with_trial_days(u32::MAX))
            .await
            .unwrap_err();
        assert!(err.validation_errors().unwrap().has("trial_days"));
        assert!(directory.list_mine(&caller).await.unwrap().is_empty());

        let detail = directory
            .create(&caller, NewOrganisation::named("Acme").with_trial_days(MAX_TRIAL_DAYS))
            .await
            .unwrap();
        assert_eq!(detail.organisation.trial_days, MAX_TRIAL_DAYS);
    }

    #[tokio::test]
    async fn test_duplicate_slug_is_field_error() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let caller = Principal::from(&user);

        directory.create(&caller, NewOrganisation::named("Acme")).await.unwrap();
        let err = directory.create(&caller, NewOrganisation::named("ACME")).await.unwrap_err();
        assert!(err.validation_errors().unwrap().has("slug"));
        assert_eq!(directory.list_mine(&caller).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_staff_listing() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let staff = store.insert_user(User::new("s@example.com", "h").staff()).await.unwrap();
        directory.create(&Principal::from(&user), NewOrganisation::named("Acme")).await.unwrap();

        let staff = Principal::from(&staff);
        assert!(directory.list_mine(&staff).await.unwrap().is_empty());
        assert_eq!(directory.list_all(&staff).await.unwrap().len(), 1);

        let err = directory.list_all(&Principal::from(&user)).await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_subscription_organisation_is_read_only() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let caller = Principal::from(&user);
        directory.create(&caller, NewOrganisation::named("Acme")).await.unwrap();

        let patch: SubscriptionPatch =
            serde_json::from_str(r#"{"organisation": "other", "status": "active"}"#).unwrap();
        let err = directory.update_subscription(&caller, "acme", patch).await.unwrap_err();
        assert!(err.validation_errors().unwrap().has("organisation"));

        let patch: SubscriptionPatch = serde_json::from_str(r#"{"status": "active"}"#).unwrap();
        let sub = directory.update_subscription(&caller, "acme", patch).await.unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_slug_survives_rename() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let caller = Principal::from(&user);
        directory.create(&caller, NewOrganisation::named("Acme")).await.unwrap();

        let changes = OrganisationChanges {
            name: Some("Acme Renamed".to_string()),
            ..Default::default()
        };
        let detail = directory.update(&caller, "acme", changes).await.unwrap();
        assert_eq!(detail.organisation.name, "Acme Renamed");
        assert_eq!(detail.organisation.slug, "acme");
    }

    #[tokio::test]
    async fn test_outsider_cannot_see_organisation() {
        let (directory, store) = directory().await;
        let user = store.insert_user(User::new("a@example.com", "h")).await.unwrap();
        let outsider = store.insert_user(User::new("o@example.com", "h")).await.unwrap();
        directory.create(&Principal::from(&user), NewOrganisation::named("Acme")).await.unwrap();

        let outsider = Principal::from(&outsider);
        for err in [
            directory.retrieve_by_slug(&outsider, "acme").await.unwrap_err(),
            directory.get_subscription(&outsider, "acme").await.unwrap_err(),
            directory.delete(&outsider, "acme").await.unwrap_err(),
        ] {
            assert!(matches!(err, ServiceError::NotFound(_)));
        }
    }
}
