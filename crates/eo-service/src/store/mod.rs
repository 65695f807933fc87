//! Storage seam
//!
//! The services talk to persistence through the [`Store`] trait. Each method
//! is one atomic storage call: compound writes (organisation provisioning,
//! membership upserts, cascading deletes) either fully apply or not at all.

use async_trait::async_trait;
use eo_org::{
    Membership, Organisation, OrganisationRole, Publication, PublicationAttachment, Subscription,
    User,
};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::query::{OrganisationScope, Page, PublicationQuery};

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;

/// Result of provisioning a new organisation.
#[derive(Debug, Clone)]
pub struct ProvisionedOrganisation {
    pub organisation: Organisation,
    pub subscription: Subscription,
    /// Owner membership of the creator, if there was one
    pub owner: Option<Membership>,
}

/// Result of a membership upsert.
#[derive(Debug, Clone)]
pub struct MembershipUpsert {
    pub membership: Membership,
    /// A new row was inserted rather than an existing role overwritten
    pub created: bool,
}

/// Everything removed by a cascading delete.
#[derive(Debug, Clone, Default)]
pub struct CascadeReport {
    pub publications: usize,
    pub memberships: usize,
    /// Storage keys of the removed attachments
    pub released_files: Vec<String>,
}

/// Persistent storage with relational semantics.
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    /// Insert a user; the case-insensitive email must be unused.
    async fn insert_user(&self, user: User) -> StoreResult<User>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Look a user up by email, case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_user(&self, user: User) -> StoreResult<User>;

    // Organisations

    /// Insert an organisation, then get-or-create its subscription and the
    /// creator's owner membership, as one atomic call.
    ///
    /// Fails with a unique violation on `slug` when the slug is taken.
    async fn provision_organisation(
        &self,
        organisation: Organisation,
        subscription: Subscription,
        owner: Option<Membership>,
    ) -> StoreResult<ProvisionedOrganisation>;

    async fn get_organisation(&self, id: Uuid) -> StoreResult<Option<Organisation>>;

    async fn get_organisation_by_slug(&self, slug: &str) -> StoreResult<Option<Organisation>>;

    async fn update_organisation(&self, organisation: Organisation) -> StoreResult<Organisation>;

    /// Delete an organisation with its subscription, memberships,
    /// publications and attachments.
    async fn delete_organisation(&self, id: Uuid) -> StoreResult<CascadeReport>;

    /// Organisations with at least one membership of `user_id`, by name.
    async fn organisations_of_user(&self, user_id: Uuid) -> StoreResult<Vec<Organisation>>;

    /// Every organisation, by name.
    async fn all_organisations(&self) -> StoreResult<Vec<Organisation>>;

    // Subscriptions

    async fn get_subscription(&self, organisation_id: Uuid) -> StoreResult<Option<Subscription>>;

    async fn update_subscription(&self, subscription: Subscription) -> StoreResult<Subscription>;

    // Memberships

    /// Insert-or-update the membership of (`user_id`, `organisation_id`).
    async fn upsert_membership(
        &self,
        organisation_id: Uuid,
        user_id: Uuid,
        role: OrganisationRole,
        invited_by: Option<Uuid>,
    ) -> StoreResult<MembershipUpsert>;

    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>>;

    async fn role_of(&self, user_id: Uuid, organisation_id: Uuid) -> StoreResult<Option<OrganisationRole>>;

    /// Memberships held by a user.
    async fn memberships_of_user(&self, user_id: Uuid) -> StoreResult<Vec<Membership>>;

    /// Memberships of the given organisations, newest first.
    async fn memberships_in(&self, organisation_ids: &[Uuid]) -> StoreResult<Vec<Membership>>;

    async fn update_membership(&self, membership: Membership) -> StoreResult<Membership>;

    async fn delete_membership(&self, id: Uuid) -> StoreResult<()>;

    // Publications

    async fn insert_publication(&self, publication: Publication) -> StoreResult<Publication>;

    async fn get_publication(&self, id: Uuid) -> StoreResult<Option<Publication>>;

    async fn update_publication(&self, publication: Publication) -> StoreResult<Publication>;

    /// Delete a publication with its attachments.
    async fn delete_publication(&self, id: Uuid) -> StoreResult<CascadeReport>;

    async fn query_publications(&self, query: &PublicationQuery) -> StoreResult<Page<Publication>>;

    /// Ids of every publication visible through `scopes`.
    async fn visible_publication_ids(&self, scopes: &[OrganisationScope]) -> StoreResult<Vec<Uuid>>;

    // Attachments

    async fn insert_attachment(&self, attachment: PublicationAttachment) -> StoreResult<PublicationAttachment>;

    async fn get_attachment(&self, id: Uuid) -> StoreResult<Option<PublicationAttachment>>;

    async fn update_attachment(&self, attachment: PublicationAttachment) -> StoreResult<PublicationAttachment>;

    async fn delete_attachment(&self, id: Uuid) -> StoreResult<PublicationAttachment>;

    /// Attachments of the given publications, newest first.
    async fn attachments_of(&self, publication_ids: &[Uuid]) -> StoreResult<Vec<PublicationAttachment>>;

    async fn count_attachments(&self, publication_id: Uuid) -> StoreResult<usize>;
}
