//! Filtering, ordering and pagination of list operations.

use chrono::{DateTime, Utc};
use eo_org::{Publication, PublicationStatus, PublicationType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// Reference to an organisation by id or slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrganisationRef {
    Id(Uuid),
    Slug(String),
}

impl OrganisationRef {
    /// Parse a raw filter value: a UUID, otherwise a slug.
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => OrganisationRef::Id(id),
            Err(_) => OrganisationRef::Slug(raw.trim().to_string()),
        }
    }
}

/// Requested page, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Resolve to a concrete (page, size) pair.
    ///
    /// The size falls back to `default_size` and is capped at `max_size`.
    pub fn resolve(&self, default_size: usize, max_size: usize) -> ServiceResult<(usize, usize)> {
        let page = self.page.unwrap_or(1);
        if page == 0 {
            return Err(ServiceError::field("page", "page numbers start at 1"));
        }
        let size = match self.page_size {
            Some(0) => return Err(ServiceError::field("page_size", "page size must be positive")),
            Some(size) => size.min(max_size),
            None => default_size,
        };
        Ok((page, size))
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Total number of matching items
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Cut one page out of an already ordered list.
    ///
    /// A page past the end is empty.
    pub fn slice(items: Vec<T>, page: usize, page_size: usize) -> Self {
        let count = items.len();
        let start = page.saturating_sub(1).saturating_mul(page_size);
        let results = items.into_iter().skip(start).take(page_size).collect();
        Self {
            count,
            page,
            page_size,
            results,
        }
    }

    /// Number of pages.
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            (self.count + self.page_size - 1) / self.page_size
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Convert the results, keeping the paging data.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Field a publication list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationOrderField {
    PublishedAt,
    EventStart,
    Title,
}

/// Ordering of a publication list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationOrdering {
    pub field: PublicationOrderField,
    pub descending: bool,
}

impl Default for PublicationOrdering {
    fn default() -> Self {
        Self {
            field: PublicationOrderField::PublishedAt,
            descending: true,
        }
    }
}

impl PublicationOrdering {
    pub fn ascending(field: PublicationOrderField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn descending(field: PublicationOrderField) -> Self {
        Self {
            field,
            descending: true,
        }
    }

    /// Parse `field` or `-field`.
    ///
    /// ```
    /// use eo_service::query::{PublicationOrderField, PublicationOrdering};
    ///
    /// let ordering = PublicationOrdering::parse("-event_start").unwrap();
    /// assert_eq!(ordering.field, PublicationOrderField::EventStart);
    /// assert!(ordering.descending);
    /// assert!(PublicationOrdering::parse("created_by").is_none());
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        let field = match name {
            "published_at" | "date_publication" => PublicationOrderField::PublishedAt,
            "event_start" => PublicationOrderField::EventStart,
            "title" => PublicationOrderField::Title,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    /// Compare two publications; ties fall back to the id.
    ///
    /// Missing event starts sort last ascending and first descending.
    pub fn compare(&self, a: &Publication, b: &Publication) -> Ordering {
        let primary = match self.field {
            PublicationOrderField::PublishedAt => a.published_at.cmp(&b.published_at),
            PublicationOrderField::EventStart => compare_nulls_last(a.event_start, b.event_start),
            PublicationOrderField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        };
        let ordered = primary.then_with(|| a.id.cmp(&b.id));
        if self.descending {
            ordered.reverse()
        } else {
            ordered
        }
    }
}

fn compare_nulls_last(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Caller-supplied publication filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationFilter {
    #[serde(default)]
    pub organisation: Option<OrganisationRef>,

    #[serde(rename = "type", default)]
    pub kind: Option<PublicationType>,

    #[serde(default)]
    pub status: Option<PublicationStatus>,

    /// Case-insensitive substring over title, content and location
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub ordering: Option<PublicationOrdering>,

    #[serde(flatten)]
    pub page: PageRequest,
}

impl PublicationFilter {
    pub fn for_organisation(organisation: OrganisationRef) -> Self {
        Self {
            organisation: Some(organisation),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_status(mut self, status: PublicationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, kind: PublicationType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn ordered_by(mut self, ordering: PublicationOrdering) -> Self {
        self.ordering = Some(ordering);
        self
    }
}

/// Visibility of one organisation's publications for a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrganisationScope {
    pub organisation_id: Uuid,
    /// Drafts and archived items are included
    pub include_unpublished: bool,
}

impl OrganisationScope {
    /// Whether a publication is visible through this scope.
    pub fn admits(&self, publication: &Publication) -> bool {
        self.organisation_id == publication.organisation_id
            && (self.include_unpublished || publication.status == PublicationStatus::Published)
    }
}

/// A fully resolved publication query, as executed by the store.
#[derive(Debug, Clone)]
pub struct PublicationQuery {
    /// Organisations the caller may read; nothing outside is returned
    pub scopes: Vec<OrganisationScope>,
    pub kind: Option<PublicationType>,
    pub status: Option<PublicationStatus>,
    pub search: Option<String>,
    /// Only events starting at or after this instant
    pub starts_after: Option<DateTime<Utc>>,
    pub ordering: PublicationOrdering,
    pub page: usize,
    pub page_size: usize,
}

impl PublicationQuery {
    /// Check a publication against scope and filters.
    pub fn matches(&self, publication: &Publication) -> bool {
        if !self.scopes.iter().any(|scope| scope.admits(publication)) {
            return false;
        }
        if self.kind.map_or(false, |kind| kind != publication.kind) {
            return false;
        }
        if self.status.map_or(false, |status| status != publication.status) {
            return false;
        }
        if let Some(after) = self.starts_after {
            if publication.event_start.map_or(true, |start| start < after) {
                return false;
            }
        }
        match &self.search {
            Some(term) => publication.matches_search(term),
            None => true,
        }
    }

    /// Filter, order and paginate `publications`.
    pub fn run<'a, I>(&self, publications: I) -> Page<Publication>
    where
        I: IntoIterator<Item = &'a Publication>,
    {
        let mut matching: Vec<Publication> = publications
            .into_iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        matching.sort_by(|a, b| self.ordering.compare(a, b));
        Page::slice(matching, self.page, self.page_size)
    }
}
