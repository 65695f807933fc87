//! # Éo Authorization
//!
//! This crate provides the authorization gate of the Éo platform.
//!
//! ## Overview
//!
//! The eo-rbac crate handles:
//! - **Actions**: Safe (read/list) and write (create/update/delete) operations
//! - **Resources**: Organisation-scoped resource kinds
//! - **Principals**: The authenticated caller and its staff/superuser flags
//! - **Gate**: The policy deciding whether a principal may act on a resource
//!
//! ## Policy
//!
//! ```text
//! safe action                         -> allow
//! write, resource has no organisation -> deny (unscoped)
//! write, staff or superuser           -> allow
//! write, owner or admin               -> allow
//! write, member                       -> deny (insufficient role)
//! write, no membership                -> deny (not a member)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use eo_org::OrganisationRole;
//! use eo_rbac::{Action, AuthorizationGate, Principal, ResourceKind, ResourceRef};
//! use uuid::Uuid;
//!
//! let caller = Principal::user(Uuid::now_v7());
//! let org = Uuid::now_v7();
//! let resource = ResourceRef::in_organisation(ResourceKind::Publication, org);
//!
//! let decision = AuthorizationGate::evaluate(&caller, Action::Create, &resource, Some(OrganisationRole::Owner));
//! assert!(decision.is_allowed());
//! ```
//!
//! ## Integration with eo-org
//!
//! Roles come from `eo-org` memberships; the gate reads them through the
//! [`MembershipSource`] trait so any registry can back it.

pub mod actions;
pub mod gate;
pub mod principal;
pub mod resources;

// Re-export main types for convenience
pub use actions::Action;
pub use gate::{AuthorizationGate, Decision, DenyReason, MembershipSource};
pub use principal::Principal;
pub use resources::{ResourceKind, ResourceRef};
