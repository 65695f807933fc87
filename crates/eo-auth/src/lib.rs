//! # Éo Authentication
//!
//! This crate provides authentication for the Éo platform.
//!
//! ## Overview
//!
//! The eo-auth crate handles:
//! - **JWT**: Access/refresh token pairs, validation and refresh exchange
//! - **Passwords**: Argon2id hashing and verification
//! - **Claims**: Caller identity and staff/superuser flags
//!
//! ## Features
//!
//! - `jwt` (default): JWT token support using jsonwebtoken
//!
//! ## Usage
//!
//! ```rust
//! use eo_auth::{hash_password, verify_password, JwtService};
//! use eo_org::User;
//!
//! let hash = hash_password("s3cret-passphrase").unwrap();
//! let user = User::new("user@example.com", hash.clone());
//! verify_password("s3cret-passphrase", &hash).unwrap();
//!
//! let service = JwtService::with_secret("a-long-enough-signing-secret").unwrap();
//! let pair = service.issue_pair(&user).unwrap();
//! let claims = service.validate_access_token(&pair.access_token).unwrap();
//! assert_eq!(claims.user_id(), Some(user.id));
//! ```
//!
//! ## Claims Structure
//!
//! `EoClaims` carries the standard JWT claims, the user's email, the token
//! type and the staff/superuser flags. Organisation roles are not embedded;
//! `eo-rbac` resolves them per request.

pub mod claims;
pub mod error;
#[cfg(feature = "jwt")]
pub mod jwt;
pub mod password;

// Re-export main types
pub use claims::{EoClaims, TokenType};
pub use error::{AuthError, AuthResult};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LEN};

#[cfg(feature = "jwt")]
pub use jwt::{JwtAlgorithm, JwtConfig, JwtService, TokenPair};
