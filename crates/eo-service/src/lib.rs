//! # Éo Services
//!
//! Membership registry, organisation directory, publication store and the
//! account services of the Éo platform.
//!
//! ## Overview
//!
//! - **Registry**: roles, invitations (idempotent upsert), membership listing
//! - **Directory**: organisation lifecycle with trial subscription provisioning
//! - **Publications**: scoped listing, search, ordering, pagination, attachments
//! - **Users**: signup, login, token refresh and profiles
//!
//! Persistence sits behind the [`Store`] trait and uploads behind
//! [`FileStorage`]. Stored files are released after the owning records are
//! deleted, through the event bus.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eo_org::NewOrganisation;
//! use eo_rbac::Principal;
//! use eo_service::{EoConfig, Platform};
//! use eo_service::users::SignupRequest;
//!
//! # async fn run() -> eo_service::ServiceResult<()> {
//! let config = EoConfig {
//!     jwt_secret: Some("change-me-change-me-change-me-32b".to_string()),
//!     ..Default::default()
//! };
//! let platform = Platform::in_memory(&config).await?;
//!
//! let user = platform
//!     .users
//!     .signup(SignupRequest {
//!         email: "owner@example.com".to_string(),
//!         password: "long enough".to_string(),
//!     })
//!     .await?;
//! let caller = Principal::from(&user);
//! let acme = platform.organisations.create(&caller, NewOrganisation::named("Acme")).await?;
//! assert_eq!(acme.organisation.slug, "acme");
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `memory`: In-memory [`Store`] implementation (enabled by default)

pub mod attachments;
pub mod cleanup;
pub mod config;
pub mod directory;
pub mod error;
pub mod files;
pub mod platform;
pub mod publications;
pub mod query;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod users;

pub use attachments::{AttachmentChanges, AttachmentService};
pub use cleanup::{release_files, FileCleanupHandler};
pub use config::{ConfigError, EoConfig};
pub use directory::{OrganisationDetail, OrganisationDirectory};
pub use error::{FileStoreError, ServiceError, ServiceResult, StoreError, StoreResult};
pub use files::{FileStorage, LocalFileStorage, Upload};
pub use platform::Platform;
pub use publications::{NewAttachment, PublicationStore, RemoveAttachment};
pub use query::{OrganisationRef, Page, PageRequest, PublicationFilter, PublicationOrderField, PublicationOrdering};
pub use registry::{InviteMembership, InviteOutcome, MembershipRegistry};
pub use store::{CascadeReport, MembershipUpsert, ProvisionedOrganisation, Store};
pub use telemetry::init_tracing;
pub use users::{LoginRequest, SignupRequest, UserService};

#[cfg(feature = "memory")]
pub use store::MemoryStore;
