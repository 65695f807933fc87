//! Serde helpers for partial updates
//!
//! A partial update has to tell apart "field absent" from "field set to
//! null". Fields typed `Option<Option<T>>` use [`double_option`] so that an
//! absent key stays `None` while an explicit `null` becomes `Some(None)`.

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (including `null`) as `Some(..)`.
///
/// Pair with `#[serde(default)]` so absent keys fall back to `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Record that a key was present, whatever its value.
pub fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}
