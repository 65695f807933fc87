//! Organisation domain models
//!
//! This module provides the core Organisation entity. Organisations are the
//! tenant boundary: publications, memberships and the subscription all hang
//! off exactly one organisation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscription::SubscriptionSummary;
use crate::validation::ValidationErrors;

/// Trial length applied when an organisation does not configure one.
pub const DEFAULT_TRIAL_DAYS: u32 = 90;

/// Longest trial an organisation may configure.
pub const MAX_TRIAL_DAYS: u32 = 3650;

const MAX_NAME_LEN: usize = 255;

/// An organisation represents a tenant in the multi-tenant system.
///
/// Users belong to organisations through memberships, each carrying a role.
/// The slug is derived from the name once, at creation, and never changes.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use eo_org::Organisation;
///
/// let creator = Uuid::now_v7();
/// let org = Organisation::new("Acme Corp", Some(creator)).unwrap();
/// assert_eq!(org.slug, "acme-corp");
/// assert_eq!(org.trial_days, 90);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organisation {
    /// Unique identifier for the organisation
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// URL-friendly slug (unique across the platform, immutable)
    pub slug: String,

    /// User who created the organisation
    pub created_by: Option<Uuid>,

    /// Street address
    #[serde(default)]
    pub address: String,

    /// Postal code
    #[serde(default)]
    pub postal_code: String,

    /// City
    #[serde(default)]
    pub city: String,

    /// Country
    #[serde(default)]
    pub country: String,

    /// Contact email
    #[serde(default)]
    pub email: String,

    /// Contact phone number
    #[serde(default)]
    pub phone: String,

    /// Length of the free trial granted at creation, in days
    pub trial_days: u32,

    /// When the organisation was created
    pub created_at: DateTime<Utc>,

    /// When the organisation was last updated
    pub updated_at: DateTime<Utc>,
}

impl Organisation {
    /// Creates a new organisation, deriving its slug from the name.
    ///
    /// # Arguments
    ///
    /// * `name` - The organisation name
    /// * `created_by` - The user creating the organisation
    ///
    /// # Errors
    ///
    /// Field errors on `name` when it is blank or too long, or on `slug`
    /// when no slug can be derived from the name.
    pub fn new(name: impl Into<String>, created_by: Option<Uuid>) -> Result<Self, ValidationErrors> {
        NewOrganisation::named(name).into_organisation(created_by, DEFAULT_TRIAL_DAYS)
    }

    /// End of the free trial, or `None` when the organisation has no trial.
    ///
    /// # Examples
    ///
    /// ```
    /// use eo_org::Organisation;
    ///
    /// let mut org = Organisation::new("Acme", None).unwrap();
    /// org.trial_days = 30;
    /// assert_eq!(org.trial_end().unwrap(), Some(org.created_at + chrono::Duration::days(30)));
    ///
    /// org.trial_days = 0;
    /// assert_eq!(org.trial_end().unwrap(), None);
    /// ```
    pub fn trial_end(&self) -> Result<Option<DateTime<Utc>>, ValidationErrors> {
        trial_end_from(self.created_at, self.trial_days)
    }

    /// Apply a partial update.
    ///
    /// The slug is immutable: a change request carrying a different slug is
    /// rejected rather than ignored.
    pub fn apply(&mut self, changes: OrganisationChanges) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(slug) = &changes.slug {
            if slug != &self.slug {
                errors.add("slug", "slug cannot be changed once set");
            }
        }
        if let Some(name) = &changes.name {
            validate_name(name, &mut errors);
        }
        if let Some(trial_days) = changes.trial_days {
            validate_trial_days(trial_days, &mut errors);
        }
        errors.into_result()?;

        if let Some(name) = changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(address) = changes.address {
            self.address = address;
        }
        if let Some(postal_code) = changes.postal_code {
            self.postal_code = postal_code;
        }
        if let Some(city) = changes.city {
            self.city = city;
        }
        if let Some(country) = changes.country {
            self.country = country;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(phone) = changes.phone {
            self.phone = phone;
        }
        if let Some(trial_days) = changes.trial_days {
            self.trial_days = trial_days;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Lightweight projection embedding the subscription state.
    pub fn summary(&self, subscription: SubscriptionSummary) -> OrganisationSummary {
        OrganisationSummary {
            id: self.id,
            name: self.name.clone(),
            slug: self.slug.clone(),
            subscription,
        }
    }
}

/// Compute a trial end from a start instant; zero days means no trial.
///
/// # Errors
///
/// A field error on `trial_days` when the end falls outside the
/// representable date range.
pub fn trial_end_from(start: DateTime<Utc>, trial_days: u32) -> Result<Option<DateTime<Utc>>, ValidationErrors> {
    if trial_days == 0 {
        return Ok(None);
    }
    start
        .checked_add_signed(Duration::days(i64::from(trial_days)))
        .map(Some)
        .ok_or_else(|| ValidationErrors::single("trial_days", "trial end is out of range"))
}

fn validate_trial_days(trial_days: u32, errors: &mut ValidationErrors) {
    if trial_days > MAX_TRIAL_DAYS {
        errors.add("trial_days", format!("trial may not exceed {} days", MAX_TRIAL_DAYS));
    }
}

/// Input for creating an organisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrganisation {
    /// Organisation name
    pub name: String,

    /// Explicit slug; derived from the name when absent
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub postal_code: String,

    #[serde(default)]
    pub city: String,

    #[serde(default)]
    pub country: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: String,

    /// Trial length in days; the platform default applies when absent
    #[serde(default)]
    pub trial_days: Option<u32>,
}

impl NewOrganisation {
    /// Input with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the trial length.
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = Some(days);
        self
    }

    /// Validate and build the organisation record.
    pub fn into_organisation(
        self,
        created_by: Option<Uuid>,
        default_trial_days: u32,
    ) -> Result<Organisation, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_name(&self.name, &mut errors);
        let trial_days = self.trial_days.unwrap_or(default_trial_days);
        validate_trial_days(trial_days, &mut errors);

        let slug = match self.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(explicit) => {
                if !is_valid_slug(explicit) {
                    errors.add("slug", "slug may only contain letters, digits, hyphens and underscores");
                }
                explicit.to_string()
            }
            None => {
                let derived = slugify(&self.name);
                if derived.is_empty() && !errors.has("name") {
                    errors.add("slug", "could not derive a slug from the name");
                }
                derived
            }
        };
        errors.into_result()?;

        let now = Utc::now();
        Ok(Organisation {
            id: Uuid::now_v7(),
            name: self.name.trim().to_string(),
            slug,
            created_by,
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            country: self.country,
            email: self.email,
            phone: self.phone,
            trial_days,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of an organisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganisationChanges {
    #[serde(default)]
    pub name: Option<String>,

    /// Only accepted when equal to the current slug
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub postal_code: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub trial_days: Option<u32>,
}

/// Summary of an organisation for list displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganisationSummary {
    /// Organisation ID
    pub id: Uuid,

    /// Organisation name
    pub name: String,

    /// Slug
    pub slug: String,

    /// Subscription state
    pub subscription: SubscriptionSummary,
}

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.add("name", "this field may not be blank");
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        errors.add("name", "ensure this field has no more than 255 characters");
    }
}

fn is_valid_slug(slug: &str) -> bool {
    slug.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Derive a URL slug from a display name.
///
/// Letters are lowercased and common Latin accents folded to ASCII; runs of
/// whitespace, punctuation and hyphens collapse into a single hyphen; other
/// characters are dropped.
///
/// # Examples
///
/// ```
/// use eo_org::organisation::slugify;
///
/// assert_eq!(slugify("Organisation Démo"), "organisation-demo");
/// assert_eq!(slugify("  Rock & Roll -- Club!  "), "rock-roll-club");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        let folded = fold_accent(c);
        if folded.is_ascii_alphanumeric() || folded == '_' {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(folded.to_ascii_lowercase());
        } else if folded.is_whitespace() || folded.is_ascii_punctuation() {
            pending_hyphen = true;
        }
    }

    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_organisation_creation() {
        let creator = Uuid::now_v7();
        let org = Organisation::new("Acme Corp", Some(creator)).unwrap();

        assert_eq!(org.name, "Acme Corp");
        assert_eq!(org.slug, "acme-corp");
        assert_eq!(org.created_by, Some(creator));
        assert_eq!(org.trial_days, DEFAULT_TRIAL_DAYS);
        assert_eq!(org.created_at, org.updated_at);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme"), "acme");
        assert_eq!(slugify("Organisation Démo"), "organisation-demo");
        assert_eq!(slugify("Café, Crème & Co."), "cafe-creme-co");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_explicit_slug_is_kept() {
        let org = NewOrganisation {
            name: "Acme Corp".to_string(),
            slug: Some("acme".to_string()),
            ..Default::default()
        }
        .into_organisation(None, 90)
        .unwrap();
        assert_eq!(org.slug, "acme");
    }

    #[test]
    fn test_invalid_input_reports_fields() {
        let errors = Organisation::new("   ", None).unwrap_err();
        assert!(errors.has("name"));

        let errors = Organisation::new("???", None).unwrap_err();
        assert!(errors.has("slug"));

        let errors = NewOrganisation {
            name: "Acme".to_string(),
            slug: Some("not a slug".to_string()),
            ..Default::default()
        }
        .into_organisation(None, 90)
        .unwrap_err();
        assert!(errors.has("slug"));
    }

    #[test]
    fn test_rename_keeps_slug() {
        let mut org = Organisation::new("Acme", None).unwrap();
        org.apply(OrganisationChanges {
            name: Some("Acme Industries".to_string()),
            city: Some("Lisbon".to_string()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(org.name, "Acme Industries");
        assert_eq!(org.slug, "acme");
        assert_eq!(org.city, "Lisbon");
    }

    #[test]
    fn test_slug_change_is_rejected() {
        let mut org = Organisation::new("Acme", None).unwrap();
        let errors = org
            .apply(OrganisationChanges {
                slug: Some("other".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(errors.has("slug"));
        assert_eq!(org.slug, "acme");

        // Resubmitting the current slug is harmless
        org.apply(OrganisationChanges {
            slug: Some("acme".to_string()),
            ..Default::default()
        })
        .unwrap();
    }

    #[test]
    fn test_trial_end() {
        let start = Utc::now();
        assert_eq!(trial_end_from(start, 0).unwrap(), None);
        assert_eq!(trial_end_from(start, 30).unwrap(), Some(start + Duration::days(30)));
    }

    #[test]
    fn test_trial_days_upper_bound() {
        let org = NewOrganisation::named("Acme")
            .with_trial_days(MAX_TRIAL_DAYS)
            .into_organisation(None, 90)
            .unwrap();
        assert_eq!(org.trial_days, MAX_TRIAL_DAYS);

        let errors = NewOrganisation::named("Acme")
            .with_trial_days(MAX_TRIAL_DAYS + 1)
            .into_organisation(None, 90)
            .unwrap_err();
        assert!(errors.has("trial_days"));

        let errors = NewOrganisation::named("Acme")
            .with_trial_days(u32::MAX)
            .into_organisation(None, 90)
            .unwrap_err();
        assert!(errors.has("trial_days"));

        // An oversized platform default is rejected the same way
        let errors = NewOrganisation::named("Acme").into_organisation(None, u32::MAX).unwrap_err();
        assert!(errors.has("trial_days"));

        let mut org = Organisation::new("Acme", None).unwrap();
        let errors = org
            .apply(OrganisationChanges {
                trial_days: Some(u32::MAX),
                ..Default::default()
            })
            .unwrap_err();
        assert!(errors.has("trial_days"));
        assert_eq!(org.trial_days, DEFAULT_TRIAL_DAYS);
    }

    #[test]
    fn test_trial_end_out_of_range_is_an_error() {
        let errors = trial_end_from(DateTime::<Utc>::MAX_UTC, 1).unwrap_err();
        assert!(errors.has("trial_days"));
    }
}
