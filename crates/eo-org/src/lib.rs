//! # Éo Organisation Models
//!
//! This crate provides the multi-tenant domain models of the Éo publication
//! platform.
//!
//! ## Overview
//!
//! The eo-org crate handles:
//! - **Organisations**: Tenant entities with contact details and a trial length
//! - **Memberships**: User-organisation links carrying a role
//! - **Roles**: The closed owner/admin/member enumeration
//! - **Subscriptions**: Trial and billing state, one per organisation
//! - **Publications**: Information posts and events with a draft/published/archived lifecycle
//! - **Attachments**: Files attached to publications
//! - **Users**: Accounts identified by email
//!
//! ## Architecture
//!
//! ```text
//! User
//!   └─ Membership (role) ─→ Organisation
//!                              ├─ Subscription (1:1)
//!                              └─ Publications
//!                                    └─ PublicationAttachment
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use eo_org::{Membership, NewPublication, Organisation, OrganisationRole, Subscription};
//! use uuid::Uuid;
//!
//! let owner_id = Uuid::now_v7();
//! let org = Organisation::new("Acme Corp", Some(owner_id)).unwrap();
//! let subscription = Subscription::provision(&org).unwrap();
//! let membership = Membership::new(org.id, owner_id, OrganisationRole::Owner);
//!
//! let post = NewPublication::information("Hello", "First post")
//!     .into_publication(org.id, Some(owner_id))
//!     .unwrap();
//! assert!(!post.is_published);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization support (enabled by default)

pub mod attachment;
pub mod membership;
pub mod organisation;
pub mod patch;
pub mod publication;
pub mod roles;
pub mod subscription;
pub mod user;
pub mod validation;

// Re-export main types for convenience
pub use attachment::{unique_upload_name, PublicationAttachment, ATTACHMENT_SUBFOLDER};
pub use membership::{Membership, MembershipView};
pub use organisation::{
    NewOrganisation, Organisation, OrganisationChanges, OrganisationSummary, DEFAULT_TRIAL_DAYS,
    MAX_TRIAL_DAYS,
};
pub use publication::{
    validate_schedule, NewPublication, Publication, PublicationPatch, PublicationStatus,
    PublicationSummary, PublicationType,
};
pub use roles::OrganisationRole;
pub use subscription::{Subscription, SubscriptionPatch, SubscriptionStatus, SubscriptionSummary};
pub use user::{normalize_email, ProfileChanges, User, UserRoleHint};
pub use validation::ValidationErrors;
