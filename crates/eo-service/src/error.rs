//! Service error taxonomy
//!
//! Every operation fails with one of five classes: validation (field-level),
//! permission denied, not found, unauthenticated, or internal. Storage and
//! file-storage failures surface as internal.

use eo_auth::AuthError;
use eo_org::ValidationErrors;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// A unique constraint rejected the write
    #[error("Unique constraint violated on {field}")]
    UniqueViolation { field: &'static str },

    /// Backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: Uuid) -> Self {
        StoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// File storage errors.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key escapes the storage root or is empty
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or rule-breaking input, with per-field detail
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Authenticated but not allowed
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Absent, or invisible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad credentials or an invalid token
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Storage or infrastructure failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Single-field validation error.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation(ValidationErrors::single(field, message))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ServiceError::NotFound(what.into())
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        ServiceError::PermissionDenied(reason.into())
    }

    /// Field errors, if this is a validation error.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ServiceError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServiceError::Internal(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::Unauthenticated(_) => 401,
            ServiceError::PermissionDenied(_) => 403,
            ServiceError::NotFound(_) => 404,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "VALIDATION_ERROR",
            ServiceError::Unauthenticated(_) => "UNAUTHENTICATED",
            ServiceError::PermissionDenied(_) => "PERMISSION_DENIED",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        ServiceError::Validation(errors)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = ValidationErrors::new();
        for (field, errors) in errors.field_errors() {
            for error in errors {
                let message = match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                };
                fields.add(field.to_string(), message);
            }
        }
        ServiceError::Validation(fields)
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { kind, id } => ServiceError::NotFound(format!("{} {}", kind, id)),
            StoreError::UniqueViolation { field } => {
                ServiceError::field(field, format!("a record with this {} already exists", field))
            }
            StoreError::Backend(message) => ServiceError::Internal(message),
        }
    }
}

impl From<FileStoreError> for ServiceError {
    fn from(error: FileStoreError) -> Self {
        ServiceError::Internal(error.to_string())
    }
}

impl From<AuthError> for ServiceError {
    fn from(error: AuthError) -> Self {
        if error.is_server_error() {
            ServiceError::Internal(error.to_string())
        } else {
            ServiceError::Unauthenticated(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_distinct() {
        let errors = [
            ServiceError::field("title", "required"),
            ServiceError::Unauthenticated("token".into()),
            ServiceError::denied("role"),
            ServiceError::not_found("publication"),
            ServiceError::Internal("db".into()),
        ];
        let codes: Vec<u16> = errors.iter().map(|e| e.status_code()).collect();
        assert_eq!(codes, vec![400, 401, 403, 404, 500]);
        assert!(errors[4].is_server_error());
    }

    #[test]
    fn test_unique_violation_is_field_error() {
        let error: ServiceError = StoreError::UniqueViolation { field: "slug" }.into();
        assert!(error.validation_errors().unwrap().has("slug"));
    }

    #[test]
    fn test_auth_errors_map_to_unauthenticated() {
        let error: ServiceError = AuthError::InvalidCredentials.into();
        assert_eq!(error.status_code(), 401);

        let error: ServiceError = AuthError::ConfigError("no secret".into()).into();
        assert_eq!(error.status_code(), 500);
    }
}
