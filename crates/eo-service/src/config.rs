//! Service configuration.
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for local development.

use chrono::Duration;
use eo_auth::JwtConfig;
use eo_org::DEFAULT_TRIAL_DAYS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing required environment variable.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Platform configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EoConfig {
    /// HMAC secret for JWT signing.
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,

    /// JWT issuer.
    pub jwt_issuer: String,

    /// Access token lifetime in minutes.
    pub access_token_minutes: i64,

    /// Refresh token lifetime in days.
    pub refresh_token_days: i64,

    /// Trial length for organisations that do not set one.
    pub default_trial_days: u32,

    /// Root directory of stored uploads.
    pub media_root: PathBuf,

    /// Default page size of list operations.
    pub page_size: usize,

    /// Largest page size a caller may request.
    pub max_page_size: usize,

    /// Emit JSON log lines.
    pub log_json: bool,
}

impl Default for EoConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_issuer: eo_auth::claims::DEFAULT_ISSUER.to_string(),
            access_token_minutes: 60,
            refresh_token_days: 7,
            default_trial_days: DEFAULT_TRIAL_DAYS,
            media_root: PathBuf::from("./media"),
            page_size: 20,
            max_page_size: 100,
            log_json: false,
        }
    }
}

impl EoConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `EO_JWT_SECRET`: JWT signing secret
    /// - `EO_JWT_ISSUER`: JWT issuer (default: eo-platform)
    /// - `EO_ACCESS_TOKEN_MINUTES`: Access token lifetime (default: 60)
    /// - `EO_REFRESH_TOKEN_DAYS`: Refresh token lifetime (default: 7)
    /// - `EO_DEFAULT_TRIAL_DAYS`: Default organisation trial length (default: 90)
    /// - `EO_MEDIA_ROOT`: Upload directory (default: ./media)
    /// - `EO_PAGE_SIZE`: Default page size (default: 20)
    /// - `EO_MAX_PAGE_SIZE`: Maximum page size (default: 100)
    /// - `EO_LOG_JSON`: JSON log output (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();

        let config = Self {
            jwt_secret: lookup("EO_JWT_SECRET").filter(|s| !s.is_empty()),
            jwt_issuer: lookup("EO_JWT_ISSUER").unwrap_or(default.jwt_issuer),
            access_token_minutes: parse_or(&lookup, "EO_ACCESS_TOKEN_MINUTES", default.access_token_minutes)?,
            refresh_token_days: parse_or(&lookup, "EO_REFRESH_TOKEN_DAYS", default.refresh_token_days)?,
            default_trial_days: parse_or(&lookup, "EO_DEFAULT_TRIAL_DAYS", default.default_trial_days)?,
            media_root: lookup("EO_MEDIA_ROOT").map(PathBuf::from).unwrap_or(default.media_root),
            page_size: parse_or(&lookup, "EO_PAGE_SIZE", default.page_size)?,
            max_page_size: parse_or(&lookup, "EO_MAX_PAGE_SIZE", default.max_page_size)?,
            log_json: lookup("EO_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(default.log_json),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_minutes <= 0 {
            return Err(invalid("EO_ACCESS_TOKEN_MINUTES", "must be positive"));
        }
        if self.refresh_token_days <= 0 {
            return Err(invalid("EO_REFRESH_TOKEN_DAYS", "must be positive"));
        }
        if self.page_size == 0 {
            return Err(invalid("EO_PAGE_SIZE", "must be positive"));
        }
        if self.max_page_size < self.page_size {
            return Err(invalid("EO_MAX_PAGE_SIZE", "must not be smaller than EO_PAGE_SIZE"));
        }
        Ok(())
    }

    /// Validate that all required configuration is present for production.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        match &self.jwt_secret {
            None => Err(ConfigError::MissingEnvVar("EO_JWT_SECRET".to_string())),
            Some(secret) if secret.len() < 32 => Err(invalid("EO_JWT_SECRET", "must be at least 32 bytes")),
            Some(_) => Ok(()),
        }
    }

    /// JWT settings derived from this configuration.
    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            access_token_duration: Duration::minutes(self.access_token_minutes),
            refresh_token_duration: Duration::days(self.refresh_token_days),
            ..Default::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, &e.to_string())),
        None => Ok(default),
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EoConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.access_token_minutes, 60);
        assert_eq!(config.refresh_token_days, 7);
        assert_eq!(config.default_trial_days, 90);
        assert_eq!(config.media_root, PathBuf::from("./media"));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_page_size, 100);
        assert!(!config.log_json);
        assert!(config.jwt_secret.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EoConfig::from_lookup(lookup(&[
            ("EO_JWT_SECRET", "s"),
            ("EO_DEFAULT_TRIAL_DAYS", "30"),
            ("EO_PAGE_SIZE", "5"),
            ("EO_LOG_JSON", "1"),
            ("EO_MEDIA_ROOT", "/srv/media"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_secret.as_deref(), Some("s"));
        assert_eq!(config.default_trial_days, 30);
        assert_eq!(config.page_size, 5);
        assert!(config.log_json);
        assert_eq!(config.media_root, PathBuf::from("/srv/media"));
    }

    #[test]
    fn test_invalid_values() {
        let err = EoConfig::from_lookup(lookup(&[("EO_PAGE_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "EO_PAGE_SIZE"));

        let err = EoConfig::from_lookup(lookup(&[("EO_PAGE_SIZE", "200")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "EO_MAX_PAGE_SIZE"));
    }

    #[test]
    fn test_production_requires_secret() {
        let mut config = EoConfig::default();
        assert!(matches!(config.validate_for_production(), Err(ConfigError::MissingEnvVar(_))));

        config.jwt_secret = Some("short".to_string());
        assert!(config.validate_for_production().is_err());

        config.jwt_secret = Some("x".repeat(32));
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_jwt_config() {
        let mut config = EoConfig::default();
        config.access_token_minutes = 15;
        let jwt = config.jwt_config();
        assert_eq!(jwt.access_token_duration, Duration::minutes(15));
        assert_eq!(jwt.refresh_token_duration, Duration::days(7));
    }
}
