//! JWT claims
//!
//! Claims carry only the caller's identity and platform flags. Organisation
//! roles are never embedded: they are read from the membership registry on
//! every request so a role change takes effect immediately.

use chrono::{DateTime, Utc};
use eo_rbac::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default token issuer.
pub const DEFAULT_ISSUER: &str = "eo-platform";

/// Default token audience.
pub const DEFAULT_AUDIENCE: &str = "eo-api";

/// Standard JWT claims with platform extensions.
///
/// # Example
///
/// ```rust
/// use eo_auth::claims::EoClaims;
/// use uuid::Uuid;
///
/// let user_id = Uuid::now_v7();
/// let claims = EoClaims::new(user_id, "user@example.com", chrono::Duration::hours(1));
/// assert_eq!(claims.user_id(), Some(user_id));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EoClaims {
    // Standard JWT claims (RFC 7519)
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// JWT ID
    pub jti: String,

    // Platform claims
    /// User email
    pub email: String,

    /// Access or refresh
    pub token_type: TokenType,

    #[serde(default)]
    pub is_staff: bool,

    #[serde(default)]
    pub is_superuser: bool,
}

impl EoClaims {
    /// Create new access claims for a user.
    pub fn new(user_id: Uuid, email: impl Into<String>, duration: chrono::Duration) -> Self {
        let now = Utc::now();
        let exp = now + duration;

        Self {
            sub: user_id.to_string(),
            iss: DEFAULT_ISSUER.to_string(),
            aud: vec![DEFAULT_AUDIENCE.to_string()],
            exp: exp.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::now_v7().to_string(),
            email: email.into(),
            token_type: TokenType::Access,
            is_staff: false,
            is_superuser: false,
        }
    }

    /// Get the user ID as UUID.
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Get expiration as DateTime.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// The principal these claims authenticate.
    pub fn principal(&self) -> Option<Principal> {
        self.user_id().map(|user_id| Principal {
            user_id,
            is_staff: self.is_staff,
            is_superuser: self.is_superuser,
        })
    }

    /// Set issuer and audience.
    pub fn with_issuer(mut self, issuer: impl Into<String>, audience: Vec<String>) -> Self {
        self.iss = issuer.into();
        self.aud = audience;
        self
    }

    /// Set the token type.
    pub fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = token_type;
        self
    }

    /// Set the staff and superuser flags.
    pub fn with_privileges(mut self, is_staff: bool, is_superuser: bool) -> Self {
        self.is_staff = is_staff;
        self.is_superuser = is_superuser;
        self
    }
}

/// Token type enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Access token (short-lived)
    #[default]
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::now_v7();
        let claims = EoClaims::new(user_id, "test@example.com", Duration::hours(1));

        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_principal() {
        let user_id = Uuid::now_v7();
        let claims = EoClaims::new(user_id, "staff@example.com", Duration::hours(1))
            .with_privileges(true, false);

        let principal = claims.principal().unwrap();
        assert_eq!(principal.user_id, user_id);
        assert!(principal.bypasses_membership());

        let mut broken = claims.clone();
        broken.sub = "not-a-uuid".to_string();
        assert!(broken.principal().is_none());
    }

    #[test]
    fn test_claims_expiration() {
        let mut claims = EoClaims::new(Uuid::now_v7(), "test@example.com", Duration::hours(1));
        claims.exp = Utc::now().timestamp() - 3600;

        assert!(claims.is_expired());
    }
}
