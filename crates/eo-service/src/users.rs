//! Signup, login and profiles.

use eo_auth::{hash_password, verify_password, AuthError, JwtService, TokenPair, MIN_PASSWORD_LEN};
use eo_org::{ProfileChanges, User};
use eo_rbac::Principal;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use validator::Validate;

use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::store::Store;

// `validator` length bounds are `u64`; mirrors `eo_auth::MIN_PASSWORD_LEN`.
const MIN_PASSWORD_LEN_U64: u64 = MIN_PASSWORD_LEN as u64;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = MIN_PASSWORD_LEN_U64, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Account management and token issuance.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    jwt: Arc<JwtService>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, jwt: Arc<JwtService>) -> Self {
        Self { store, jwt }
    }

    /// Register a new account. The email must not be in use, in any case.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> ServiceResult<User> {
        request.validate()?;

        if self.store.find_user_by_email(&request.email).await?.is_some() {
            return Err(duplicate_email());
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .store
            .insert_user(User::new(request.email, password_hash))
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { field: "email" } => duplicate_email(),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Check credentials and issue an access/refresh pair.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn authenticate(&self, request: LoginRequest) -> ServiceResult<TokenPair> {
        request.validate()?;

        let user = self
            .store
            .find_user_by_email(&request.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(&request.password, &user.password_hash)
            .inspect_err(|_| tracing::debug!(user_id = %user.id, "Rejected login"))?;

        Ok(self.jwt.issue_pair(&user)?)
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        Ok(self.jwt.refresh(refresh_token)?)
    }

    /// Resolve an access token to the caller it was issued to.
    ///
    /// Privileges are read from the stored user, not from the token.
    pub async fn resolve(&self, access_token: &str) -> ServiceResult<Principal> {
        let claims = self.jwt.validate_access_token(access_token)?;
        let user_id = claims
            .principal()
            .map(|principal| principal.user_id)
            .ok_or_else(|| AuthError::MissingClaim("sub".to_string()))?;
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("user no longer exists".to_string()))?;
        Ok(Principal::from(&user))
    }

    pub async fn profile(&self, caller: &Principal) -> ServiceResult<User> {
        self.store
            .get_user(caller.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user {}", caller.user_id)))
    }

    pub async fn update_profile(&self, caller: &Principal, changes: ProfileChanges) -> ServiceResult<User> {
        let mut user = self.profile(caller).await?;
        user.apply(changes);
        Ok(self.store.update_user(user).await?)
    }
}

fn duplicate_email() -> ServiceError {
    ServiceError::field("email", "a user with this email already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> UserService {
        let jwt = JwtService::with_secret("test-secret-key-that-is-long-enough").unwrap();
        UserService::new(Arc::new(MemoryStore::new()), Arc::new(jwt))
    }

    fn signup(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_hashes_password() {
        let users = service();
        let user = users.signup(signup("Alice@Example.com", "correct horse")).await.unwrap();

        assert_eq!(user.email, "Alice@Example.com");
        assert_eq!(user.username, "Alice@Example.com");
        assert!(user.password_hash.starts_with("$argon2"));
        assert_ne!(user.password_hash, "correct horse");
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let users = service();

        let err = users.signup(signup("alice@example.com", "short")).await.unwrap_err();
        assert!(err.validation_errors().unwrap().has("password"));

        let err = users.signup(signup("not-an-email", "long enough")).await.unwrap_err();
        assert!(err.validation_errors().unwrap().has("email"));

        users.signup(signup("alice@example.com", "long enough")).await.unwrap();
        let err = users.signup(signup("ALICE@example.com", "long enough")).await.unwrap_err();
        assert!(err.validation_errors().unwrap().has("email"));
    }

    #[tokio::test]
    async fn test_password_length_boundary() {
        let users = service();
        let just_short = "p".repeat(MIN_PASSWORD_LEN - 1);
        let just_long_enough = "p".repeat(MIN_PASSWORD_LEN);

        let err = users.signup(signup("a@example.com", &just_short)).await.unwrap_err();
        assert!(err.validation_errors().unwrap().has("password"));
        users.signup(signup("a@example.com", &just_long_enough)).await.unwrap();
    }

    #[tokio::test]
    async fn test_authenticate_and_resolve() {
        let users = service();
        let user = users.signup(signup("alice@example.com", "long enough")).await.unwrap();

        let pair = users.authenticate(login("ALICE@example.com", "long enough")).await.unwrap();
        assert_eq!(pair.token_type, "Bearer");

        let principal = users.resolve(&pair.access_token).await.unwrap();
        assert_eq!(principal.user_id, user.id);
        assert!(!principal.bypasses_membership());

        // Refresh tokens are not access credentials
        let err = users.resolve(&pair.refresh_token).await.unwrap_err();
        assert_eq!(err.status_code(), 401);

        let renewed = users.refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(users.resolve(&renewed.access_token).await.unwrap().user_id, user.id);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthenticated() {
        let users = service();
        users.signup(signup("alice@example.com", "long enough")).await.unwrap();

        for attempt in [login("alice@example.com", "wrong password"), login("bob@example.com", "long enough")] {
            let err = users.authenticate(attempt).await.unwrap_err();
            assert!(matches!(err, ServiceError::Unauthenticated(_)));
        }
    }

    #[tokio::test]
    async fn test_update_profile() {
        let users = service();
        let user = users.signup(signup("alice@example.com", "long enough")).await.unwrap();
        let caller = Principal::from(&user);

        let changes: ProfileChanges = serde_json::from_str(r#"{"phone": "+33 6 00"}"#).unwrap();
        let updated = users.update_profile(&caller, changes).await.unwrap();
        assert_eq!(updated.phone, "+33 6 00");
        assert_eq!(users.profile(&caller).await.unwrap().phone, "+33 6 00");
    }
}
