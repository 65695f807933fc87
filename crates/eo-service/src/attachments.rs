//! Standalone attachment surface
//!
//! Same authorization as the publication sub-resource: an attachment is
//! visible when its publication is, and writable by owners and admins of the
//! publication's organisation.

use eo_org::{unique_upload_name, Publication, PublicationAttachment, ATTACHMENT_SUBFOLDER};
use eo_rbac::{Action, Principal, ResourceKind};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::cleanup::release_files;
use crate::error::{ServiceError, ServiceResult};
use crate::files::Upload;
use crate::publications::{NewAttachment, PublicationStore};
use crate::store::Store;

/// Changes to an existing attachment.
#[derive(Debug, Clone, Default)]
pub struct AttachmentChanges {
    pub display_name: Option<String>,
    /// Replacement file; the previous one is released
    pub file: Option<Upload>,
}

impl AttachmentChanges {
    pub fn rename(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            file: None,
        }
    }

    pub fn replace(upload: Upload) -> Self {
        Self {
            display_name: None,
            file: Some(upload),
        }
    }
}

#[derive(Clone)]
pub struct AttachmentService {
    publications: PublicationStore,
    store: Arc<dyn Store>,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn Store>, publications: PublicationStore) -> Self {
        Self { publications, store }
    }

    /// Attachments of every publication the caller can see, newest first.
    pub async fn list(&self, caller: &Principal) -> ServiceResult<Vec<PublicationAttachment>> {
        let scopes = self.publications.scopes(caller).await?;
        let publication_ids = self.store.visible_publication_ids(&scopes).await?;
        Ok(self.store.attachments_of(&publication_ids).await?)
    }

    pub async fn retrieve(&self, caller: &Principal, id: Uuid) -> ServiceResult<PublicationAttachment> {
        let (attachment, _) = self.visible(caller, id).await?;
        Ok(attachment)
    }

    #[instrument(skip(self, caller, attachment), fields(user_id = %caller.user_id))]
    pub async fn create(
        &self,
        caller: &Principal,
        publication_id: Uuid,
        attachment: NewAttachment,
    ) -> ServiceResult<PublicationAttachment> {
        self.publications.add_attachment(caller, publication_id, attachment).await
    }

    /// Rename and/or replace the stored file.
    #[instrument(skip(self, caller, changes), fields(user_id = %caller.user_id))]
    pub async fn update(
        &self,
        caller: &Principal,
        id: Uuid,
        changes: AttachmentChanges,
    ) -> ServiceResult<PublicationAttachment> {
        let (mut attachment, publication) = self.visible(caller, id).await?;
        self.publications
            .authorize(caller, Action::Update, ResourceKind::Attachment, &publication)
            .await?;

        if let Some(display_name) = changes.display_name {
            attachment.rename(display_name)?;
        }

        let mut released = Vec::new();
        let mut stored = None;
        if let Some(upload) = changes.file {
            let key = unique_upload_name(ATTACHMENT_SUBFOLDER, &upload.filename);
            let size = upload.size();
            self.publications.files().save(&key, upload.bytes).await?;
            released.push(attachment.replace_file(key.clone(), size));
            stored = Some(key);
        }

        let attachment = match self.store.update_attachment(attachment).await {
            Ok(attachment) => attachment,
            Err(e) => {
                // The new file is orphaned; the old one stays referenced
                let orphan = stored.into_iter().collect();
                release_files(self.publications.bus(), Some(publication.organisation_id), orphan).await;
                return Err(e.into());
            }
        };

        tracing::info!(attachment_id = %attachment.id, replaced = !released.is_empty(), "Attachment updated");
        release_files(self.publications.bus(), Some(publication.organisation_id), released).await;
        Ok(attachment)
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn delete(&self, caller: &Principal, id: Uuid) -> ServiceResult<()> {
        let (attachment, publication) = self.visible(caller, id).await?;
        self.publications
            .authorize(caller, Action::Delete, ResourceKind::Attachment, &publication)
            .await?;
        self.publications.detach(&publication, attachment).await
    }

    async fn visible(&self, caller: &Principal, id: Uuid) -> ServiceResult<(PublicationAttachment, Publication)> {
        let not_found = || ServiceError::not_found(format!("attachment {}", id));
        let attachment = self.store.get_attachment(id).await?.ok_or_else(not_found)?;
        let publication = self
            .publications
            .visible(caller, attachment.publication_id)
            .await
            .map_err(|e| match e {
                ServiceError::NotFound(_) => not_found(),
                other => other,
            })?;
        Ok((attachment, publication))
    }
}
