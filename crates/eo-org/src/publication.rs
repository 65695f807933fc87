//! Publication domain models
//!
//! This module provides the Publication entity: information posts and events
//! published by an organisation. Publications follow a draft, published,
//! archived lifecycle; only published ones are visible to plain members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::organisation::OrganisationSummary;
use crate::patch::double_option;
use crate::validation::ValidationErrors;

const MAX_TITLE_LEN: usize = 255;
const MAX_LOCATION_LEN: usize = 255;
const PREVIEW_LEN: usize = 120;

/// Kind of publication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PublicationType {
    /// Plain informational post
    Information,

    /// Event with a start (and optional end) time
    #[serde(alias = "evenement")]
    Event,
}

impl PublicationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Information => "information",
            Self::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "information" => Some(Self::Information),
            "event" | "evenement" => Some(Self::Event),
            _ => None,
        }
    }
}

impl Default for PublicationType {
    fn default() -> Self {
        Self::Information
    }
}

/// Lifecycle status of a publication.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PublicationStatus {
    /// Work in progress, visible to admins and owners only
    Draft,

    /// Visible to every member
    Published,

    /// Withdrawn, visible to admins and owners only
    Archived,
}

impl PublicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl Default for PublicationStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// A piece of content published by an organisation.
///
/// `is_published` is derived from `status` on every save and is never taken
/// from input.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use eo_org::{NewPublication, PublicationStatus};
///
/// let mut input = NewPublication::information("Welcome", "First post");
/// input.status = PublicationStatus::Published;
/// input.is_published = Some(false);
///
/// let publication = input.into_publication(Uuid::now_v7(), None).unwrap();
/// assert!(publication.is_published);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    /// Unique identifier
    pub id: Uuid,

    /// Owning organisation
    pub organisation_id: Uuid,

    /// Information or event
    #[serde(rename = "type")]
    pub kind: PublicationType,

    /// Lifecycle status
    pub status: PublicationStatus,

    /// Mirror of `status == Published`
    pub is_published: bool,

    /// Title
    pub title: String,

    /// Body text
    pub content: String,

    /// Publication date, set at creation and independent of status changes
    pub published_at: DateTime<Utc>,

    /// Event start (required for events)
    pub event_start: Option<DateTime<Utc>>,

    /// Event end (never before the start)
    pub event_end: Option<DateTime<Utc>>,

    /// Event location
    #[serde(default)]
    pub event_location: String,

    /// User who created the publication
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Publication {
    /// Recompute derived fields before the record is written.
    ///
    /// Every save path goes through here so `is_published` always mirrors
    /// the status.
    pub fn prepare_save(&mut self) {
        self.is_published = self.status == PublicationStatus::Published;
        self.updated_at = Utc::now();
    }

    /// Apply a partial update, validating the merged result first.
    ///
    /// Nothing is modified when validation fails.
    pub fn apply(&mut self, patch: PublicationPatch) -> Result<(), ValidationErrors> {
        let kind = patch.kind.unwrap_or(self.kind);
        let event_start = patch.event_start.unwrap_or(self.event_start);
        let event_end = patch.event_end.unwrap_or(self.event_end);

        let mut errors = ValidationErrors::new();
        if let Some(title) = &patch.title {
            validate_title(title, &mut errors);
        }
        if let Some(content) = &patch.content {
            validate_content(content, &mut errors);
        }
        if let Some(location) = &patch.event_location {
            validate_location(location, &mut errors);
        }
        validate_schedule_into(kind, event_start, event_end, &mut errors);
        errors.into_result()?;

        self.kind = kind;
        self.event_start = event_start;
        self.event_end = event_end;
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(location) = patch.event_location {
            self.event_location = location;
        }
        self.prepare_save();
        Ok(())
    }

    /// First 120 characters of the content, with an ellipsis if cut.
    pub fn content_preview(&self) -> String {
        let mut chars = self.content.chars();
        let preview: String = chars.by_ref().take(PREVIEW_LEN).collect();
        if chars.next().is_some() {
            format!("{}…", preview)
        } else {
            preview
        }
    }

    /// Published event starting at or after `now`.
    pub fn is_upcoming_event(&self, now: DateTime<Utc>) -> bool {
        self.kind == PublicationType::Event
            && self.status == PublicationStatus::Published
            && self.event_start.map_or(false, |start| start >= now)
    }

    /// Case-insensitive substring match on title, content and location.
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [&self.title, &self.content, &self.event_location]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    /// List projection.
    pub fn summary(&self, organisation: OrganisationSummary, attachments_count: usize) -> PublicationSummary {
        PublicationSummary {
            id: self.id,
            organisation,
            kind: self.kind,
            status: self.status,
            title: self.title.clone(),
            content_preview: self.content_preview(),
            published_at: self.published_at,
            event_start: self.event_start,
            event_end: self.event_end,
            event_location: self.event_location.clone(),
            attachments_count,
        }
    }
}

/// Validate the event window rules.
///
/// - events require `event_start`
/// - `event_end` may not precede `event_start`
pub fn validate_schedule(
    kind: PublicationType,
    event_start: Option<DateTime<Utc>>,
    event_end: Option<DateTime<Utc>>,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate_schedule_into(kind, event_start, event_end, &mut errors);
    errors.into_result()
}

fn validate_schedule_into(
    kind: PublicationType,
    event_start: Option<DateTime<Utc>>,
    event_end: Option<DateTime<Utc>>,
    errors: &mut ValidationErrors,
) {
    if kind == PublicationType::Event && event_start.is_none() {
        errors.add("event_start", "this field is required for event publications");
    }
    if let (Some(start), Some(end)) = (event_start, event_end) {
        if end < start {
            errors.add("event_end", "event_end must not be earlier than event_start");
        }
    }
}

fn validate_title(title: &str, errors: &mut ValidationErrors) {
    if title.trim().is_empty() {
        errors.add("title", "this field may not be blank");
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.add("title", "ensure this field has no more than 255 characters");
    }
}

fn validate_content(content: &str, errors: &mut ValidationErrors) {
    if content.trim().is_empty() {
        errors.add("content", "this field may not be blank");
    }
}

fn validate_location(location: &str, errors: &mut ValidationErrors) {
    if location.chars().count() > MAX_LOCATION_LEN {
        errors.add("event_location", "ensure this field has no more than 255 characters");
    }
}

/// Input for creating a publication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPublication {
    /// Target organisation; the caller's current membership is used when absent
    #[serde(default)]
    pub organisation: Option<Uuid>,

    #[serde(rename = "type", default)]
    pub kind: PublicationType,

    #[serde(default)]
    pub status: PublicationStatus,

    pub title: String,

    pub content: String,

    #[serde(default)]
    pub event_start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub event_end: Option<DateTime<Utc>>,

    #[serde(default)]
    pub event_location: String,

    /// Accepted for compatibility and ignored
    #[serde(default)]
    pub is_published: Option<bool>,
}

impl NewPublication {
    /// Information post draft.
    pub fn information(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Event draft.
    pub fn event(
        title: impl Into<String>,
        content: impl Into<String>,
        event_start: Option<DateTime<Utc>>,
        event_end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            kind: PublicationType::Event,
            title: title.into(),
            content: content.into(),
            event_start,
            event_end,
            ..Default::default()
        }
    }

    /// Target an explicit organisation.
    pub fn in_organisation(mut self, organisation_id: Uuid) -> Self {
        self.organisation = Some(organisation_id);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: PublicationStatus) -> Self {
        self.status = status;
        self
    }

    /// Check the business rules without building a record.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_title(&self.title, &mut errors);
        validate_content(&self.content, &mut errors);
        validate_location(&self.event_location, &mut errors);
        validate_schedule_into(self.kind, self.event_start, self.event_end, &mut errors);
        errors.into_result()
    }

    /// Validate and build the record for `organisation_id`.
    pub fn into_publication(
        self,
        organisation_id: Uuid,
        created_by: Option<Uuid>,
    ) -> Result<Publication, ValidationErrors> {
        self.validate()?;

        let now = Utc::now();
        let mut publication = Publication {
            id: Uuid::now_v7(),
            organisation_id,
            kind: self.kind,
            status: self.status,
            is_published: false,
            title: self.title,
            content: self.content,
            published_at: now,
            event_start: self.event_start,
            event_end: self.event_end,
            event_location: self.event_location,
            created_by,
            created_at: now,
            updated_at: now,
        };
        publication.prepare_save();
        Ok(publication)
    }
}

/// Partial update of a publication.
///
/// The owning organisation and publication date are read-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationPatch {
    #[serde(rename = "type", default)]
    pub kind: Option<PublicationType>,

    #[serde(default)]
    pub status: Option<PublicationStatus>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub event_start: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub event_end: Option<Option<DateTime<Utc>>>,

    #[serde(default)]
    pub event_location: Option<String>,

    /// Accepted for compatibility and ignored
    #[serde(default)]
    pub is_published: Option<bool>,
}

impl PublicationPatch {
    /// Patch changing only the status.
    pub fn status(status: PublicationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Lightweight publication projection for lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationSummary {
    pub id: Uuid,
    pub organisation: OrganisationSummary,
    #[serde(rename = "type")]
    pub kind: PublicationType,
    pub status: PublicationStatus,
    pub title: String,
    pub content_preview: String,
    pub published_at: DateTime<Utc>,
    pub event_start: Option<DateTime<Utc>>,
    pub event_end: Option<DateTime<Utc>>,
    pub event_location: String,
    pub attachments_count: usize,
}
