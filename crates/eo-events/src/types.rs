//! Event types
//!
//! This module defines the domain events published after a storage call
//! commits.

use chrono::{DateTime, Utc};
use eo_org::{OrganisationRole, PublicationStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::bus::{EventBusError, EventBusResult};

/// Event envelope.
///
/// All events are wrapped in this envelope which provides metadata for
/// routing and tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event type, also the topic (e.g. "publication.saved")
    pub event_type: String,

    /// Timestamp when event was created
    pub timestamp: DateTime<Utc>,

    /// Organisation context
    pub organisation_id: Option<Uuid>,

    /// User who triggered the event
    pub user_id: Option<Uuid>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            organisation_id: None,
            user_id: None,
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set organisation context.
    pub fn with_organisation(mut self, organisation_id: Uuid) -> Self {
        self.organisation_id = Some(organisation_id);
        self
    }

    /// Set user context.
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Get the topic for this event.
    pub fn topic(&self) -> &str {
        &self.event_type
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Event categories for filtering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Organisation,
    Membership,
    Publication,
    Attachment,
    User,
}

impl EventCategory {
    /// Parse from event type string.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let prefix = event_type.split('.').next()?;
        match prefix {
            "organisation" | "subscription" => Some(EventCategory::Organisation),
            "membership" => Some(EventCategory::Membership),
            "publication" => Some(EventCategory::Publication),
            "attachment" => Some(EventCategory::Attachment),
            "user" => Some(EventCategory::User),
            _ => None,
        }
    }
}

fn envelope<T: Serialize>(event_type: &str, organisation_id: Option<Uuid>, body: &T) -> EventBusResult<Event> {
    let payload = serde_json::to_value(body).map_err(|e| EventBusError::SerializationError(e.to_string()))?;
    let event = Event::new(event_type, payload);
    Ok(match organisation_id {
        Some(id) => event.with_organisation(id),
        None => event,
    })
}

/// Organisation lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrganisationEvent {
    /// Organisation created with its owner membership and subscription
    Created {
        organisation_id: Uuid,
        slug: String,
        created_by: Option<Uuid>,
        trial_end: Option<DateTime<Utc>>,
    },
    /// Organisation deleted with everything it owned
    Deleted {
        organisation_id: Uuid,
        slug: String,
        released_files: usize,
    },
}

impl OrganisationEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let (event_type, organisation_id) = match self {
            OrganisationEvent::Created { organisation_id, .. } => ("organisation.created", organisation_id),
            OrganisationEvent::Deleted { organisation_id, .. } => ("organisation.deleted", organisation_id),
        };
        envelope(event_type, Some(*organisation_id), self)
    }
}

/// Membership events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MembershipEvent {
    /// Membership created or its role overwritten
    Upserted {
        membership_id: Uuid,
        organisation_id: Uuid,
        user_id: Uuid,
        role: OrganisationRole,
        created: bool,
    },
    /// Membership removed
    Removed {
        membership_id: Uuid,
        organisation_id: Uuid,
        user_id: Uuid,
    },
}

impl MembershipEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let (event_type, organisation_id) = match self {
            MembershipEvent::Upserted { organisation_id, .. } => ("membership.upserted", organisation_id),
            MembershipEvent::Removed { organisation_id, .. } => ("membership.removed", organisation_id),
        };
        envelope(event_type, Some(*organisation_id), self)
    }
}

/// Publication events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublicationEvent {
    /// Publication created or updated
    Saved {
        publication_id: Uuid,
        organisation_id: Uuid,
        status: PublicationStatus,
        is_published: bool,
        created: bool,
    },
    /// Publication deleted with its attachments
    Deleted {
        publication_id: Uuid,
        organisation_id: Uuid,
    },
}

impl PublicationEvent {
    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        let (event_type, organisation_id) = match self {
            PublicationEvent::Saved { organisation_id, .. } => ("publication.saved", organisation_id),
            PublicationEvent::Deleted { organisation_id, .. } => ("publication.deleted", organisation_id),
        };
        envelope(event_type, Some(*organisation_id), self)
    }
}

/// Attachment events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttachmentEvent {
    /// A stored file is no longer referenced and may be deleted
    FileReleased {
        file: String,
        organisation_id: Option<Uuid>,
    },
}

impl AttachmentEvent {
    /// Topic of released-file events.
    pub const FILE_RELEASED: &'static str = "attachment.file_released";

    /// Convert to generic event.
    pub fn to_event(&self) -> EventBusResult<Event> {
        match self {
            AttachmentEvent::FileReleased { organisation_id, .. } => {
                envelope(Self::FILE_RELEASED, *organisation_id, self)
            }
        }
    }
}
