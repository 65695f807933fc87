//! Service wiring
//!
//! [`Platform`] builds every service over one store, one event bus and one
//! file storage, and registers the post-commit file cleanup hook.

use eo_auth::JwtService;
use eo_events::EventBus;
use std::sync::Arc;

use crate::attachments::AttachmentService;
use crate::cleanup::FileCleanupHandler;
use crate::config::EoConfig;
use crate::directory::OrganisationDirectory;
use crate::error::{ServiceError, ServiceResult};
use crate::files::FileStorage;
use crate::publications::PublicationStore;
use crate::registry::MembershipRegistry;
use crate::store::Store;
use crate::users::UserService;

/// All services of the platform.
#[derive(Clone)]
pub struct Platform {
    pub users: UserService,
    pub memberships: MembershipRegistry,
    pub organisations: OrganisationDirectory,
    pub publications: PublicationStore,
    pub attachments: AttachmentService,
    bus: Arc<dyn EventBus>,
}

impl Platform {
    /// Wire the services over the given backends.
    ///
    /// # Errors
    ///
    /// Internal when the JWT settings are unusable (no secret).
    pub async fn new(
        config: &EoConfig,
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        files: Arc<dyn FileStorage>,
    ) -> ServiceResult<Self> {
        let jwt = Arc::new(JwtService::new(config.jwt_config())?);

        bus.register_handler(Arc::new(FileCleanupHandler::new(files.clone())))
            .await
            .map_err(|e| ServiceError::Internal(e.to_string()))?;

        let memberships = MembershipRegistry::new(store.clone(), bus.clone());
        let organisations =
            OrganisationDirectory::new(store.clone(), bus.clone(), memberships.clone(), config.default_trial_days);
        let publications = PublicationStore::new(store.clone(), bus.clone(), files, memberships.clone())
            .with_page_sizes(config.page_size, config.max_page_size);
        let attachments = AttachmentService::new(store.clone(), publications.clone());
        let users = UserService::new(store, jwt);

        tracing::info!(
            media_root = %config.media_root.display(),
            default_trial_days = config.default_trial_days,
            "Platform services ready"
        );

        Ok(Self {
            users,
            memberships,
            organisations,
            publications,
            attachments,
            bus,
        })
    }

    /// In-memory store and event bus, files under the configured media root.
    ///
    /// Cleanup handlers run inline, so released files are gone once the
    /// deleting call returns.
    #[cfg(feature = "memory")]
    pub async fn in_memory(config: &EoConfig) -> ServiceResult<Self> {
        let files = crate::files::LocalFileStorage::new(&config.media_root).await?;
        Self::new(
            config,
            Arc::new(crate::store::MemoryStore::new()),
            Arc::new(eo_events::MemoryEventBus::inline()),
            Arc::new(files),
        )
        .await
    }

    pub fn bus(&self) -> &Arc<dyn EventBus> {
        &self.bus
    }
}
