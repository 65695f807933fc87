//! JWT token generation and validation
//!
//! Access/refresh token pairs signed with an HMAC secret using the
//! jsonwebtoken crate.

use crate::claims::{EoClaims, TokenType, DEFAULT_AUDIENCE, DEFAULT_ISSUER};
use crate::error::{AuthError, AuthResult};
use chrono::Duration;
use eo_org::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};

/// JWT configuration for token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC algorithms
    pub secret: Option<String>,

    /// Algorithm to use
    pub algorithm: JwtAlgorithm,

    /// Token issuer
    pub issuer: String,

    /// Token audience
    pub audience: Vec<String>,

    /// Access token duration
    pub access_token_duration: Duration,

    /// Refresh token duration
    pub refresh_token_duration: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: JwtAlgorithm::HS256,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: vec![DEFAULT_AUDIENCE.to_string()],
            access_token_duration: Duration::hours(1),
            refresh_token_duration: Duration::days(7),
        }
    }
}

/// Supported JWT algorithms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl From<JwtAlgorithm> for Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        }
    }
}

/// JWT service for token operations.
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

impl JwtService {
    /// Create a new JWT service with the given configuration.
    pub fn new(config: JwtConfig) -> AuthResult<Self> {
        let secret = config
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::ConfigError("Secret required for HMAC".to_string()))?;

        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
        })
    }

    /// Create with a simple secret (HS256).
    pub fn with_secret(secret: impl Into<String>) -> AuthResult<Self> {
        let config = JwtConfig {
            secret: Some(secret.into()),
            ..Default::default()
        };
        Self::new(config)
    }

    fn claims_for(&self, user_id: Uuid, email: &str, token_type: TokenType, is_staff: bool, is_superuser: bool) -> EoClaims {
        let duration = match token_type {
            TokenType::Access => self.config.access_token_duration,
            TokenType::Refresh => self.config.refresh_token_duration,
        };
        EoClaims::new(user_id, email, duration)
            .with_issuer(self.config.issuer.clone(), self.config.audience.clone())
            .with_token_type(token_type)
            .with_privileges(is_staff, is_superuser)
    }

    /// Generate an access token for a user.
    pub fn generate_access_token(&self, user: &User) -> AuthResult<String> {
        let claims = self.claims_for(user.id, &user.email, TokenType::Access, user.is_staff, user.is_superuser);
        self.encode_claims(&claims)
    }

    /// Generate a refresh token for a user.
    pub fn generate_refresh_token(&self, user: &User) -> AuthResult<String> {
        let claims = self.claims_for(user.id, &user.email, TokenType::Refresh, user.is_staff, user.is_superuser);
        self.encode_claims(&claims)
    }

    /// Issue an access/refresh pair for a freshly authenticated user.
    pub fn issue_pair(&self, user: &User) -> AuthResult<TokenPair> {
        Ok(TokenPair::new(
            self.generate_access_token(user)?,
            self.generate_refresh_token(user)?,
            self.config.access_token_duration.num_seconds(),
        ))
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// Access tokens are rejected.
    pub fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.validate_token(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType {
                expected: TokenType::Refresh.as_str(),
            });
        }
        let user_id = claims
            .user_id()
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;

        let access = self.claims_for(user_id, &claims.email, TokenType::Access, claims.is_staff, claims.is_superuser);
        let refresh = self.claims_for(user_id, &claims.email, TokenType::Refresh, claims.is_staff, claims.is_superuser);
        Ok(TokenPair::new(
            self.encode_claims(&access)?,
            self.encode_claims(&refresh)?,
            self.config.access_token_duration.num_seconds(),
        ))
    }

    /// Generate a token from existing claims.
    pub fn encode_claims(&self, claims: &EoClaims) -> AuthResult<String> {
        let header = Header::new(self.config.algorithm.into());
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Token encoding failed: {}", e)))
    }

    /// Validate and decode a token of any type.
    pub fn validate_token(&self, token: &str) -> AuthResult<EoClaims> {
        let mut validation = Validation::new(self.config.algorithm.into());
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&self.config.audience);

        let token_data: TokenData<EoClaims> = decode(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AuthError::InvalidToken("Malformed token".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AuthError::InvalidToken("Invalid signature".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                    AuthError::InvalidToken("Invalid issuer".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    AuthError::InvalidToken("Invalid audience".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// Validate an access token, rejecting refresh tokens.
    pub fn validate_access_token(&self, token: &str) -> AuthResult<EoClaims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType {
                expected: TokenType::Access.as_str(),
            });
        }
        Ok(claims)
    }

    /// Get the configuration.
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }
}

/// Token pair containing access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,

    /// Refresh token (long-lived)
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Access token expiration in seconds
    pub expires_in: i64,
}

impl TokenPair {
    /// Create a new token pair.
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> String {
        "test-secret-key-for-jwt-signing-minimum-32-chars".to_string()
    }

    fn user() -> User {
        User::new("test@example.com", "hash")
    }

    #[test]
    fn test_jwt_service_creation() {
        let service = JwtService::with_secret(test_secret()).unwrap();
        assert_eq!(service.config().algorithm, JwtAlgorithm::HS256);

        assert!(matches!(
            JwtService::with_secret(""),
            Err(AuthError::ConfigError(_))
        ));
    }

    #[test]
    fn test_token_generation_and_validation() {
        let service = JwtService::with_secret(test_secret()).unwrap();
        let user = user();

        let token = service.generate_access_token(&user).unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.user_id(), Some(user.id));
        assert_eq!(claims.email, "test@example.com");
        assert!(!claims.is_staff);
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::with_secret(test_secret()).unwrap();
        let result = service.validate_token("invalid-token");

        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let service = JwtService::with_secret(test_secret()).unwrap();
        let other = JwtService::with_secret("another-secret-key-that-is-long-enough").unwrap();

        let token = other.generate_access_token(&user()).unwrap();
        assert!(matches!(service.validate_token(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::with_secret(test_secret()).unwrap();
        let mut claims = EoClaims::new(Uuid::now_v7(), "test@example.com", Duration::hours(1));
        claims.exp = chrono::Utc::now().timestamp() - 3600;

        let token = service.encode_claims(&claims).unwrap();
        assert!(matches!(service.validate_token(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_refresh_exchange() {
        let service = JwtService::with_secret(test_secret()).unwrap();
        let user = user().staff();
        let pair = service.issue_pair(&user).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        // Access tokens cannot be exchanged
        assert!(matches!(
            service.refresh(&pair.access_token),
            Err(AuthError::WrongTokenType { expected: "refresh" })
        ));
        // Refresh tokens cannot be used as access tokens
        assert!(matches!(
            service.validate_access_token(&pair.refresh_token),
            Err(AuthError::WrongTokenType { expected: "access" })
        ));

        let renewed = service.refresh(&pair.refresh_token).unwrap();
        let claims = service.validate_access_token(&renewed.access_token).unwrap();
        assert_eq!(claims.user_id(), Some(user.id));
        assert!(claims.is_staff);
    }

    #[test]
    fn test_token_pair() {
        let pair = TokenPair::new("access".to_string(), "refresh".to_string(), 3600);

        assert_eq!(pair.access_token, "access");
        assert_eq!(pair.refresh_token, "refresh");
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
    }
}
