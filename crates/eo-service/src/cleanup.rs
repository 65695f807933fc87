//! Post-commit file cleanup
//!
//! Services publish [`AttachmentEvent::FileReleased`] after the storage call
//! that dropped a file reference has committed. [`FileCleanupHandler`] then
//! deletes the stored object. Failures are logged and never reach the caller.

use async_trait::async_trait;
use eo_events::{AttachmentEvent, Event, EventBus, EventBusError, EventBusResult, EventHandler};
use std::sync::Arc;
use uuid::Uuid;

use crate::files::FileStorage;

/// Deletes stored objects whose last reference is gone.
pub struct FileCleanupHandler {
    files: Arc<dyn FileStorage>,
}

impl FileCleanupHandler {
    pub fn new(files: Arc<dyn FileStorage>) -> Self {
        Self { files }
    }
}

#[async_trait]
impl EventHandler for FileCleanupHandler {
    async fn handle(&self, event: Event) -> EventBusResult<()> {
        let AttachmentEvent::FileReleased { file, .. } = event
            .parse_payload::<AttachmentEvent>()
            .map_err(|e| EventBusError::SerializationError(e.to_string()))?;

        self.files
            .delete(&file)
            .await
            .map_err(|e| EventBusError::HandlerError(format!("could not delete {}: {}", file, e)))?;
        tracing::debug!(file = %file, "Released file deleted");
        Ok(())
    }

    fn topics(&self) -> Vec<String> {
        vec![AttachmentEvent::FILE_RELEASED.to_string()]
    }
}

/// Announce that `files` are no longer referenced.
///
/// Publishing is best-effort: a failure is logged and the remaining files are
/// still announced.
pub async fn release_files(bus: &dyn EventBus, organisation_id: Option<Uuid>, files: Vec<String>) {
    for file in files {
        let published = match (AttachmentEvent::FileReleased {
            file: file.clone(),
            organisation_id,
        })
        .to_event()
        {
            Ok(event) => bus.publish(event).await,
            Err(e) => Err(e),
        };
        if let Err(e) = published {
            tracing::warn!(file = %file, error = %e, "Failed to schedule file cleanup");
        }
    }
}

/// Publish a domain event after a commit, logging failures.
pub(crate) async fn announce(bus: &dyn EventBus, event: EventBusResult<Event>) {
    let published = match event {
        Ok(event) => bus.publish(event).await,
        Err(e) => Err(e),
    };
    if let Err(e) = published {
        tracing::warn!(error = %e, "Failed to publish domain event");
    }
}
