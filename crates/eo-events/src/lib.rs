//! # Éo Events
//!
//! This crate provides the domain events of the Éo platform and the
//! in-process bus that carries them to post-commit hooks.
//!
//! ## Overview
//!
//! The eo-events crate handles:
//! - **Event Types**: Strongly-typed organisation, membership, publication and attachment events
//! - **Event Bus**: Publish/subscribe messaging
//! - **Event Handlers**: Async hooks run after a storage call commits
//!
//! ## Features
//!
//! - `memory` (default): In-memory event bus for single-process services
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eo_events::{EventBus, MemoryEventBus, PublicationEvent};
//! use eo_org::PublicationStatus;
//! use uuid::Uuid;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!     let mut sub = bus.subscribe("publication.*").await.unwrap();
//!
//!     let event = PublicationEvent::Saved {
//!         publication_id: Uuid::now_v7(),
//!         organisation_id: Uuid::now_v7(),
//!         status: PublicationStatus::Published,
//!         is_published: true,
//!         created: true,
//!     };
//!     bus.publish(event.to_event().unwrap()).await.unwrap();
//!
//!     let received = sub.recv().await.unwrap();
//!     assert_eq!(received.topic(), "publication.saved");
//! }
//! ```
//!
//! ## Topics
//!
//! Topics are the event types:
//! - `organisation.created`, `organisation.deleted`
//! - `membership.upserted`, `membership.removed`
//! - `publication.saved`, `publication.deleted`
//! - `attachment.file_released`
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, HandlerDispatch,
    MemoryEventBus, Subscription,
};
pub use types::{
    AttachmentEvent, Event, EventCategory, MembershipEvent, OrganisationEvent, PublicationEvent,
};
