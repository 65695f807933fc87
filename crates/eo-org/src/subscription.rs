//! Subscription and trial state
//!
//! Every organisation owns exactly one subscription, provisioned when the
//! organisation is created. The trial end is derived from the organisation's
//! trial length at that moment and stored; it is not recomputed later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::organisation::{trial_end_from, Organisation};
use crate::patch::{double_option, present};
use crate::validation::ValidationErrors;

/// Billing status of an organisation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial period
    Trialing,

    /// Paid and current
    Active,

    /// Ended by the organisation or the billing provider
    Canceled,
}

impl SubscriptionStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::Canceled => "canceled",
        }
    }

    /// Parse status from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Trialing
    }
}

/// The subscription of one organisation.
///
/// The external billing references are carried for a future payment
/// integration and are never interpreted.
///
/// # Examples
///
/// ```
/// use eo_org::{Organisation, Subscription, SubscriptionStatus};
///
/// let mut org = Organisation::new("Acme", None).unwrap();
/// org.trial_days = 30;
/// let sub = Subscription::provision(&org).unwrap();
/// assert_eq!(sub.status, SubscriptionStatus::Trialing);
/// assert_eq!(sub.trial_end, org.trial_end().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription ID
    pub id: Uuid,

    /// Owning organisation (1:1, never changes)
    pub organisation_id: Uuid,

    /// Current status
    pub status: SubscriptionStatus,

    /// End of the free trial, if any
    pub trial_end: Option<DateTime<Utc>>,

    /// End of the current billing period, if any
    pub current_period_end: Option<DateTime<Utc>>,

    /// External billing customer reference (unused)
    #[serde(default)]
    pub stripe_customer_id: Option<String>,

    /// External billing subscription reference (unused)
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,

    /// When the subscription was created
    pub created_at: DateTime<Utc>,

    /// When the subscription was last updated
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Provision the trial subscription of a freshly created organisation.
    ///
    /// The trial counts from the organisation's creation instant; a trial
    /// length of zero leaves it open-ended.
    pub fn provision(organisation: &Organisation) -> Result<Self, ValidationErrors> {
        Self::provision_at(organisation, organisation.created_at)
    }

    /// Provision with the trial counting from `now`.
    pub fn provision_at(organisation: &Organisation, now: DateTime<Utc>) -> Result<Self, ValidationErrors> {
        Ok(Self {
            id: Uuid::now_v7(),
            organisation_id: organisation.id,
            status: SubscriptionStatus::Trialing,
            trial_end: trial_end_from(now, organisation.trial_days)?,
            current_period_end: None,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check if the organisation is inside its trial at `now`.
    pub fn is_trial_active(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.trial_end) {
            (SubscriptionStatus::Trialing, Some(end)) => now < end,
            (SubscriptionStatus::Trialing, None) => true,
            (SubscriptionStatus::Active | SubscriptionStatus::Canceled, _) => false,
        }
    }

    /// Whole days left in the trial, `None` if there is no bounded trial.
    pub fn trial_days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status != SubscriptionStatus::Trialing {
            return None;
        }
        self.trial_end.map(|end| (end - now).num_days().max(0))
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// A field error on `organisation` if the patch tries to set it.
    pub fn apply(&mut self, patch: SubscriptionPatch) -> Result<(), ValidationErrors> {
        if patch.organisation.is_some() {
            return Err(ValidationErrors::single("organisation", "this field is read-only"));
        }

        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(trial_end) = patch.trial_end {
            self.trial_end = trial_end;
        }
        if let Some(current_period_end) = patch.current_period_end {
            self.current_period_end = current_period_end;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Public projection embedded in organisation payloads.
    pub fn summary(&self) -> SubscriptionSummary {
        SubscriptionSummary {
            status: self.status,
            trial_end: self.trial_end,
            current_period_end: self.current_period_end,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Subscription state without identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub status: SubscriptionStatus,
    pub trial_end: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a subscription.
///
/// `organisation` only records whether the caller tried to set it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionPatch {
    #[serde(default)]
    pub status: Option<SubscriptionStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub trial_end: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub current_period_end: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub organisation: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn org_with_trial(days: u32) -> Organisation {
        let mut org = Organisation::new("Acme", None).unwrap();
        org.trial_days = days;
        org
    }

    #[test]
    fn test_provision_trial() {
        let org = org_with_trial(30);
        let now = Utc::now();
        let sub = Subscription::provision_at(&org, now).unwrap();

        assert_eq!(sub.organisation_id, org.id);
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert_eq!(sub.trial_end, Some(now + Duration::days(30)));
        assert!(sub.current_period_end.is_none());
        assert!(sub.stripe_customer_id.is_none());
    }

    #[test]
    fn test_provision_without_trial() {
        let sub = Subscription::provision(&org_with_trial(0)).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
        assert!(sub.trial_end.is_none());
        assert!(sub.is_trial_active(Utc::now()));
        assert_eq!(sub.trial_days_remaining(Utc::now()), None);
    }

    #[test]
    fn test_trial_state() {
        let now = Utc::now();
        let mut sub = Subscription::provision_at(&org_with_trial(10), now).unwrap();

        assert!(sub.is_trial_active(now + Duration::days(9)));
        assert!(!sub.is_trial_active(now + Duration::days(11)));
        assert_eq!(sub.trial_days_remaining(now + Duration::days(3)), Some(7));
        assert_eq!(sub.trial_days_remaining(now + Duration::days(30)), Some(0));

        sub.status = SubscriptionStatus::Active;
        assert!(!sub.is_trial_active(now));
    }

    #[test]
    fn test_patch_rejects_organisation() {
        let mut sub = Subscription::provision(&org_with_trial(30)).unwrap();
        let patch: SubscriptionPatch =
            serde_json::from_str(r#"{"status": "active", "organisation": 7}"#).unwrap();

        let errors = sub.apply(patch).unwrap_err();
        assert!(errors.has("organisation"));
        assert_eq!(sub.status, SubscriptionStatus::Trialing);
    }

    #[test]
    fn test_patch_updates_fields() {
        let mut sub = Subscription::provision(&org_with_trial(30)).unwrap();
        let patch: SubscriptionPatch =
            serde_json::from_str(r#"{"status": "canceled", "trial_end": null}"#).unwrap();

        sub.apply(patch).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Canceled);
        assert!(sub.trial_end.is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(SubscriptionStatus::parse("ACTIVE"), Some(SubscriptionStatus::Active));
        assert_eq!(SubscriptionStatus::parse("cancelled"), Some(SubscriptionStatus::Canceled));
        assert_eq!(SubscriptionStatus::parse("paused"), None);
    }
}
