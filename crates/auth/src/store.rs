//! Storage contracts the auth crate depends on.
//!
//! Implementations live in `chirpy-infra`. Every operation is atomic with
//! respect to concurrent callers; in particular `revoke_refresh_token` is a
//! single revoke-if-not-revoked step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chirpy_core::{StoreResult, UserId};

use crate::refresh::{RefreshTokenRecord, RevokeOutcome};
use crate::user::{NewUser, User};

/// What login needs to know about a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,
    pub password_hash: String,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> StoreResult<()>;

    async fn refresh_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Revoke `token` at `at` unless already revoked.
    ///
    /// Returns `Ok(None)` when no such token exists.
    async fn revoke_refresh_token(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<RevokeOutcome>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with a unique violation on [`crate::user::USERS_EMAIL_KEY`] when
    /// the email is taken.
    async fn create_user(&self, user: NewUser, at: DateTime<Utc>) -> StoreResult<User>;

    async fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Replace email and password hash. Fails with `StoreError::NotFound` if
    /// the user is gone, or a unique violation if the email is taken.
    async fn update_credentials(
        &self,
        id: UserId,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<User>;

    /// Returns `Ok(None)` when the user does not exist.
    async fn set_chirpy_red(
        &self,
        id: UserId,
        is_chirpy_red: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Remove every user (and, by cascade, their chirps and refresh tokens).
    async fn delete_all_users(&self) -> StoreResult<u64>;
}
