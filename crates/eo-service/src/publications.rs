//! Publication Store
//!
//! Publications are always read through the caller's memberships: nothing of
//! an organisation the caller does not belong to is ever returned, and plain
//! members only see published items. Writes go through the authorization
//! gate against the publication's organisation.

use chrono::Utc;
use eo_events::{EventBus, PublicationEvent};
use eo_org::{
    unique_upload_name, Membership, NewPublication, OrganisationSummary, Publication, PublicationAttachment,
    PublicationPatch, PublicationStatus, PublicationSummary, PublicationType, ATTACHMENT_SUBFOLDER,
};
use eo_rbac::{Action, AuthorizationGate, Principal, ResourceKind, ResourceRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::cleanup::{announce, release_files};
use crate::error::{ServiceError, ServiceResult};
use crate::files::{FileStorage, Upload};
use crate::query::{
    OrganisationRef, OrganisationScope, Page, PageRequest, PublicationFilter, PublicationOrderField,
    PublicationOrdering, PublicationQuery,
};
use crate::registry::{ensure_allowed, MembershipRegistry};
use crate::store::Store;

/// A file to attach, with an optional display name.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub upload: Upload,
    pub display_name: String,
}

impl NewAttachment {
    pub fn new(upload: Upload) -> Self {
        Self {
            upload,
            display_name: String::new(),
        }
    }

    pub fn named(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Payload of the attachment removal sub-action.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RemoveAttachment {
    #[serde(default)]
    pub attachment_id: Option<Uuid>,
}

/// Publications, their listing and their attachments.
#[derive(Clone)]
pub struct PublicationStore {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    files: Arc<dyn FileStorage>,
    registry: MembershipRegistry,
    page_size: usize,
    max_page_size: usize,
}

impl PublicationStore {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        files: Arc<dyn FileStorage>,
        registry: MembershipRegistry,
    ) -> Self {
        Self {
            store,
            bus,
            files,
            registry,
            page_size: 20,
            max_page_size: 100,
        }
    }

    /// Set the default and largest page sizes.
    pub fn with_page_sizes(mut self, page_size: usize, max_page_size: usize) -> Self {
        self.page_size = page_size;
        self.max_page_size = max_page_size.max(1);
        self
    }

    /// Filtered, ordered, paginated listing.
    #[instrument(skip(self, caller, filter), fields(user_id = %caller.user_id))]
    pub async fn list(&self, caller: &Principal, filter: PublicationFilter) -> ServiceResult<Page<PublicationSummary>> {
        let (page, page_size) = filter.page.resolve(self.page_size, self.max_page_size)?;
        let mut scopes = self.scopes(caller).await?;

        if let Some(organisation) = &filter.organisation {
            let wanted = match organisation {
                OrganisationRef::Id(id) => Some(*id),
                OrganisationRef::Slug(slug) => self.store.get_organisation_by_slug(slug).await?.map(|o| o.id),
            };
            scopes.retain(|scope| Some(scope.organisation_id) == wanted);
        }

        let query = PublicationQuery {
            scopes,
            kind: filter.kind,
            status: filter.status,
            search: filter.search.filter(|term| !term.trim().is_empty()),
            starts_after: None,
            ordering: filter.ordering.unwrap_or_default(),
            page,
            page_size,
        };
        let results = self.store.query_publications(&query).await?;
        tracing::debug!(count = results.count, page, "Listed publications");
        self.summaries(results).await
    }

    /// Published events that have not started yet, soonest first.
    pub async fn upcoming(&self, caller: &Principal, page: PageRequest) -> ServiceResult<Page<PublicationSummary>> {
        let (page, page_size) = page.resolve(self.page_size, self.max_page_size)?;
        let query = PublicationQuery {
            scopes: self.scopes(caller).await?,
            kind: Some(PublicationType::Event),
            status: Some(PublicationStatus::Published),
            search: None,
            starts_after: Some(Utc::now()),
            ordering: PublicationOrdering::ascending(PublicationOrderField::EventStart),
            page,
            page_size,
        };
        let results = self.store.query_publications(&query).await?;
        self.summaries(results).await
    }

    /// Create a publication.
    ///
    /// Without an explicit organisation the caller's current membership is
    /// used. The stored `is_published` is always derived from the status.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn create(&self, caller: &Principal, input: NewPublication) -> ServiceResult<Publication> {
        let organisation_id = match input.organisation {
            Some(id) => {
                if self.store.get_organisation(id).await?.is_none() {
                    return Err(ServiceError::field("organisation", "organisation does not exist"));
                }
                id
            }
            None => {
                let memberships = self.store.memberships_of_user(caller.user_id).await?;
                Membership::current(&memberships)
                    .map(|m| m.organisation_id)
                    .ok_or_else(|| ServiceError::field("organisation", "no organisation could be determined"))?
            }
        };

        let resource = ResourceRef::in_organisation(ResourceKind::Publication, organisation_id);
        let decision = AuthorizationGate::authorize(&self.registry, caller, Action::Create, &resource).await?;
        ensure_allowed(decision)?;

        let publication = input.into_publication(organisation_id, Some(caller.user_id))?;
        let publication = self.store.insert_publication(publication).await?;

        tracing::info!(
            publication_id = %publication.id,
            organisation_id = %organisation_id,
            status = publication.status.as_str(),
            "Publication created"
        );
        self.announce_saved(&publication, true).await;
        Ok(publication)
    }

    pub async fn retrieve(&self, caller: &Principal, id: Uuid) -> ServiceResult<Publication> {
        self.visible(caller, id).await
    }

    /// Partial update; the merged values are validated before saving.
    #[instrument(skip(self, caller, patch), fields(user_id = %caller.user_id))]
    pub async fn update(&self, caller: &Principal, id: Uuid, patch: PublicationPatch) -> ServiceResult<Publication> {
        let mut publication = self.visible(caller, id).await?;
        self.authorize(caller, Action::Update, ResourceKind::Publication, &publication)
            .await?;

        publication.apply(patch)?;
        let publication = self.store.update_publication(publication).await?;
        tracing::info!(publication_id = %publication.id, status = publication.status.as_str(), "Publication updated");
        self.announce_saved(&publication, false).await;
        Ok(publication)
    }

    /// Delete a publication with its attachments.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn delete(&self, caller: &Principal, id: Uuid) -> ServiceResult<()> {
        let publication = self.visible(caller, id).await?;
        self.authorize(caller, Action::Delete, ResourceKind::Publication, &publication)
            .await?;

        let report = self.store.delete_publication(publication.id).await?;
        tracing::info!(
            publication_id = %publication.id,
            files = report.released_files.len(),
            "Publication deleted"
        );
        announce(
            self.bus.as_ref(),
            PublicationEvent::Deleted {
                publication_id: publication.id,
                organisation_id: publication.organisation_id,
            }
            .to_event(),
        )
        .await;
        release_files(self.bus.as_ref(), Some(publication.organisation_id), report.released_files).await;
        Ok(())
    }

    /// Attachments of one publication, newest first.
    pub async fn list_attachments(&self, caller: &Principal, id: Uuid) -> ServiceResult<Vec<PublicationAttachment>> {
        let publication = self.visible(caller, id).await?;
        Ok(self.store.attachments_of(&[publication.id]).await?)
    }

    /// Attach an uploaded file.
    #[instrument(skip(self, caller, attachment), fields(user_id = %caller.user_id))]
    pub async fn add_attachment(
        &self,
        caller: &Principal,
        id: Uuid,
        attachment: NewAttachment,
    ) -> ServiceResult<PublicationAttachment> {
        let publication = self.visible(caller, id).await?;
        self.authorize(caller, Action::Update, ResourceKind::Attachment, &publication)
            .await?;
        self.attach(&publication, attachment).await
    }

    /// Remove one attachment of the publication.
    ///
    /// # Errors
    ///
    /// A field error on `attachment_id` when it is missing, not-found when it
    /// names an attachment of another publication.
    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn remove_attachment(
        &self,
        caller: &Principal,
        id: Uuid,
        request: RemoveAttachment,
    ) -> ServiceResult<()> {
        let publication = self.visible(caller, id).await?;
        self.authorize(caller, Action::Delete, ResourceKind::Attachment, &publication)
            .await?;

        let attachment_id = request
            .attachment_id
            .ok_or_else(|| ServiceError::field("attachment_id", "this field is required"))?;
        let attachment = self
            .store
            .get_attachment(attachment_id)
            .await?
            .filter(|a| a.publication_id == publication.id)
            .ok_or_else(|| ServiceError::not_found(format!("attachment {}", attachment_id)))?;

        self.detach(&publication, attachment).await
    }

    /// Publication by id, if the caller may see it.
    pub(crate) async fn visible(&self, caller: &Principal, id: Uuid) -> ServiceResult<Publication> {
        let not_found = || ServiceError::not_found(format!("publication {}", id));
        let publication = self.store.get_publication(id).await?.ok_or_else(not_found)?;

        let role = self
            .registry
            .role_of(caller.user_id, publication.organisation_id)
            .await?
            .ok_or_else(not_found)?;
        if publication.status != PublicationStatus::Published
            && !AuthorizationGate::can_see_unpublished(caller, Some(role))
        {
            return Err(not_found());
        }
        Ok(publication)
    }

    /// Gate a write through the publication's organisation.
    pub(crate) async fn authorize(
        &self,
        caller: &Principal,
        action: Action,
        kind: ResourceKind,
        publication: &Publication,
    ) -> ServiceResult<()> {
        self.registry
            .authorize_existing(caller, action, kind, publication.organisation_id)
            .await
            .map(|_| ())
    }

    /// Visibility of each organisation the caller belongs to.
    pub(crate) async fn scopes(&self, caller: &Principal) -> ServiceResult<Vec<OrganisationScope>> {
        let memberships = self.store.memberships_of_user(caller.user_id).await?;
        Ok(memberships
            .into_iter()
            .map(|m| OrganisationScope {
                organisation_id: m.organisation_id,
                include_unpublished: AuthorizationGate::can_see_unpublished(caller, Some(m.role)),
            })
            .collect())
    }

    /// Store the upload and record it on the publication.
    pub(crate) async fn attach(
        &self,
        publication: &Publication,
        attachment: NewAttachment,
    ) -> ServiceResult<PublicationAttachment> {
        let size = attachment.upload.size();
        let key = unique_upload_name(ATTACHMENT_SUBFOLDER, &attachment.upload.filename);
        let record = PublicationAttachment::new(publication.id, key.clone(), attachment.display_name, size)?;

        self.files.save(&key, attachment.upload.bytes).await?;
        match self.store.insert_attachment(record).await {
            Ok(record) => {
                tracing::info!(
                    attachment_id = %record.id,
                    publication_id = %publication.id,
                    size,
                    "Attachment added"
                );
                Ok(record)
            }
            Err(e) => {
                release_files(self.bus.as_ref(), Some(publication.organisation_id), vec![key]).await;
                Err(e.into())
            }
        }
    }

    /// Delete the record, then release its file.
    pub(crate) async fn detach(&self, publication: &Publication, attachment: PublicationAttachment) -> ServiceResult<()> {
        let removed = self.store.delete_attachment(attachment.id).await?;
        tracing::info!(attachment_id = %removed.id, publication_id = %publication.id, "Attachment removed");
        release_files(self.bus.as_ref(), Some(publication.organisation_id), vec![removed.file]).await;
        Ok(())
    }

    pub(crate) fn bus(&self) -> &dyn EventBus {
        self.bus.as_ref()
    }

    pub(crate) fn files(&self) -> &dyn FileStorage {
        self.files.as_ref()
    }

    async fn summaries(&self, page: Page<Publication>) -> ServiceResult<Page<PublicationSummary>> {
        let mut organisations: HashMap<Uuid, OrganisationSummary> = HashMap::new();
        let mut summaries = Vec::with_capacity(page.results.len());

        for publication in &page.results {
            let organisation = match organisations.get(&publication.organisation_id) {
                Some(summary) => summary.clone(),
                None => {
                    let summary = self.organisation_summary(publication.organisation_id).await?;
                    organisations.insert(publication.organisation_id, summary.clone());
                    summary
                }
            };
            let attachments = self.store.count_attachments(publication.id).await?;
            summaries.push(publication.summary(organisation, attachments));
        }

        Ok(Page {
            count: page.count,
            page: page.page,
            page_size: page.page_size,
            results: summaries,
        })
    }

    async fn organisation_summary(&self, organisation_id: Uuid) -> ServiceResult<OrganisationSummary> {
        let organisation = self
            .store
            .get_organisation(organisation_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("organisation {}", organisation_id)))?;
        let subscription = self
            .store
            .get_subscription(organisation_id)
            .await?
            .ok_or_else(|| ServiceError::Internal(format!("organisation {} has no subscription", organisation_id)))?;
        Ok(organisation.summary(subscription.summary()))
    }

    async fn announce_saved(&self, publication: &Publication, created: bool) {
        announce(
            self.bus.as_ref(),
            PublicationEvent::Saved {
                publication_id: publication.id,
                organisation_id: publication.organisation_id,
                status: publication.status,
                is_published: publication.is_published,
                created,
            }
            .to_event(),
        )
        .await;
    }
}
