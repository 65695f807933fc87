//! # Resource Kinds
//!
//! Every resource the gate protects, and how each one relates to its owning
//! organisation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of protected resources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// The organisation itself.
    Organisation,
    /// The subscription of an organisation.
    Subscription,
    /// A membership inside an organisation.
    Membership,
    /// A publication of an organisation.
    Publication,
    /// A file attached to a publication.
    Attachment,
}

impl ResourceKind {
    /// Get the string representation of the resource kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Organisation => "organisation",
            ResourceKind::Subscription => "subscription",
            ResourceKind::Membership => "membership",
            ResourceKind::Publication => "publication",
            ResourceKind::Attachment => "attachment",
        }
    }

    /// Parse resource kind from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "organisation" | "organization" => Some(ResourceKind::Organisation),
            "subscription" => Some(ResourceKind::Subscription),
            "membership" => Some(ResourceKind::Membership),
            "publication" => Some(ResourceKind::Publication),
            "attachment" => Some(ResourceKind::Attachment),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource as seen by the gate: its kind and owning organisation.
///
/// Attachments resolve to the organisation of their parent publication.
/// A reference without an organisation is denied for every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub organisation_id: Option<Uuid>,
}

impl ResourceRef {
    /// Resource owned by `organisation_id`.
    pub fn in_organisation(kind: ResourceKind, organisation_id: Uuid) -> Self {
        Self {
            kind,
            organisation_id: Some(organisation_id),
        }
    }

    /// Resource with no owning organisation.
    pub fn unscoped(kind: ResourceKind) -> Self {
        Self {
            kind,
            organisation_id: None,
        }
    }
}
