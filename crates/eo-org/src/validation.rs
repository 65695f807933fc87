//! Field-level validation errors
//!
//! Business rules on the domain models report failures per field so the
//! caller can point at exactly which input was rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A collection of validation messages keyed by field name.
///
/// # Examples
///
/// ```
/// use eo_org::ValidationErrors;
///
/// let mut errors = ValidationErrors::new();
/// errors.add("event_start", "required for events");
/// assert!(errors.has("event_start"));
/// assert!(errors.into_result().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding a single field error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Check whether a field has at least one error.
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded for a field.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// All fields with errors, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Check if no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_messages_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("email", "invalid");
        errors.add("email", "already used");
        errors.add("password", "too short");

        assert_eq!(errors.field("email").map(|m| m.len()), Some(2));
        assert!(errors.has("password"));
        assert!(!errors.has("slug"));
        assert_eq!(errors.to_string(), "email: invalid; email: already used; password: too short");
    }

    #[test]
    fn test_serializes_as_field_map() {
        let errors = ValidationErrors::single("event_end", "must not precede event_start");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"event_end": ["must not precede event_start"]}));
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        assert!(ValidationErrors::single("slug", "taken").into_result().is_err());
    }
}
