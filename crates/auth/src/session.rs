//! Login, refresh and revoke flows.
//!
//! These flows work on opaque, persisted refresh tokens and therefore talk to
//! storage directly; they never go through the access-token middleware.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use chirpy_core::UserId;

use crate::error::AuthError;
use crate::password::{hash_password, verify_password, PasswordError};
use crate::refresh::{generate_refresh_token, RefreshTokenRecord, RevokeOutcome};
use crate::store::{CredentialStore, RefreshTokenStore};
use crate::token::{Hs256Jwt, ACCESS_TOKEN_TTL_SECS};

/// Hash checked when the email is unknown, so that path pays the same bcrypt
/// cost as a wrong password.
static DUMMY_HASH: LazyLock<Result<String, PasswordError>> =
    LazyLock::new(|| hash_password("chirpy-unknown-user"));

/// Tokens handed out by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    credentials: Arc<dyn CredentialStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt: Arc<Hs256Jwt>,
    access_ttl: Duration,
}

impl core::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionService")
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

impl SessionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt: Arc<Hs256Jwt>,
    ) -> Self {
        Self {
            credentials,
            refresh_tokens,
            jwt,
            access_ttl: Duration::seconds(ACCESS_TOKEN_TTL_SECS),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn jwt(&self) -> &Arc<Hs256Jwt> {
        &self.jwt
    }

    /// Exchange email and password for an access token and a refresh token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    #[tracing::instrument(skip(self, password, now))]
    pub async fn login(&self, email: &str, password: &str, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let Some(creds) = self.credentials.credentials_by_email(email).await? else {
            debug!("login for unknown email");
            if let Err(e) = verify_against_dummy_blocking(password).await {
                warn!(error = %e, "dummy password check failed");
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password_blocking(password, &creds.password_hash).await? {
            debug!(user_id = %creds.user_id, "login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.jwt.issue(creds.user_id, now, self.access_ttl)?;
        let refresh_token = generate_refresh_token()?;
        self.refresh_tokens
            .create_refresh_token(RefreshTokenRecord::issue(refresh_token.clone(), creds.user_id, now))
            .await?;

        info!(user_id = %creds.user_id, "user logged in");
        Ok(Session {
            user_id: creds.user_id,
            access_token,
            refresh_token,
        })
    }

    /// Mint a fresh access token from a usable refresh token.
    #[tracing::instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let Some(record) = self.refresh_tokens.refresh_token(refresh_token).await? else {
            debug!("refresh with unknown token");
            return Err(AuthError::InvalidCredentials);
        };

        if let Err(e) = record.check_usable(now) {
            debug!(user_id = %record.user_id, reason = %e, "refresh token rejected");
            return Err(e.into());
        }

        Ok(self.jwt.issue(record.user_id, now, self.access_ttl)?)
    }

    /// Revoke a refresh token. Revoking twice is not an error.
    #[tracing::instrument(skip_all)]
    pub async fn revoke(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<RevokeOutcome, AuthError> {
        match self.refresh_tokens.revoke_refresh_token(refresh_token, now).await? {
            Some(outcome @ RevokeOutcome::Revoked(_)) => {
                info!("refresh token revoked");
                Ok(outcome)
            }
            Some(outcome @ RevokeOutcome::AlreadyRevoked(_)) => {
                debug!("refresh token was already revoked");
                Ok(outcome)
            }
            None => {
                warn!("revoke for unknown refresh token");
                Err(AuthError::NotFound)
            }
        }
    }
}

async fn verify_password_blocking(candidate: &str, hash: &str) -> Result<bool, AuthError> {
    let candidate = candidate.to_owned();
    let hash = hash.to_owned();
    Ok(tokio::task::spawn_blocking(move || verify_password(&candidate, &hash))
        .await
        .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))??)
}

async fn verify_against_dummy_blocking(candidate: &str) -> Result<(), AuthError> {
    let candidate = candidate.to_owned();
    tokio::task::spawn_blocking(move || match DUMMY_HASH.as_ref() {
        Ok(hash) => verify_password(&candidate, hash).map(|_| ()),
        Err(e) => Err(e.clone()),
    })
    .await
    .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))??;
    Ok(())
}

/// Hash a password off the async executor.
pub async fn hash_password_blocking(plaintext: &str) -> Result<String, PasswordError> {
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&plaintext))
        .await
        .map_err(|e| PasswordError::Hashing(format!("hashing task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chirpy_core::StoreResult;

    use crate::store::Credentials;

    #[derive(Default)]
    struct FakeStore {
        users: Mutex<HashMap<String, Credentials>>,
        tokens: Mutex<HashMap<String, RefreshTokenRecord>>,
    }

    #[async_trait]
    impl CredentialStore for FakeStore {
        async fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
            Ok(self.users.lock().unwrap().get(email).cloned())
        }
    }

    #[async_trait]
    impl RefreshTokenStore for FakeStore {
        async fn create_refresh_token(&self, record: RefreshTokenRecord) -> StoreResult<()> {
            self.tokens.lock().unwrap().insert(record.token.clone(), record);
            Ok(())
        }

        async fn refresh_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
            Ok(self.tokens.lock().unwrap().get(token).cloned())
        }

        async fn revoke_refresh_token(
            &self,
            token: &str,
            at: DateTime<Utc>,
        ) -> StoreResult<Option<RevokeOutcome>> {
            Ok(self.tokens.lock().unwrap().get_mut(token).map(|r| r.revoke(at)))
        }
    }

    async fn service_with_user(email: &str, password: &str) -> (SessionService, UserId) {
        let store = Arc::new(FakeStore::default());
        let user_id = UserId::new();
        let password_hash = hash_password_blocking(password).await.unwrap();
        store
            .users
            .lock()
            .unwrap()
            .insert(email.to_string(), Credentials { user_id, password_hash });
        let service = SessionService::new(store.clone(), store, Arc::new(Hs256Jwt::new("session-secret")));
        (service, user_id)
    }

    #[tokio::test]
    async fn login_issues_both_tokens() {
        let (service, user_id) = service_with_user("walt@breakingbad.com", "pass").await;
        let now = Utc::now();

        let session = service.login("walt@breakingbad.com", "pass", now).await.unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.refresh_token.len(), 64);
        assert_eq!(service.jwt().validate(&session.access_token, now), Ok(user_id));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let (service, _) = service_with_user("walt@breakingbad.com", "pass").await;
        let now = Utc::now();

        let unknown = service.login("jesse@breakingbad.com", "pass", now).await.unwrap_err();
        let wrong = service.login("walt@breakingbad.com", "nope", now).await.unwrap_err();

        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(wrong, AuthError::InvalidCredentials);
    }

    #[test]
    fn dummy_hash_is_a_real_bcrypt_hash() {
        let hash = DUMMY_HASH.as_ref().unwrap();
        assert!(hash.starts_with("$2b$10$"));
        assert_eq!(verify_password("pass", hash), Ok(false));
    }

    #[tokio::test]
    async fn unknown_email_pays_the_bcrypt_cost() {
        let (service, _) = service_with_user("walt@breakingbad.com", "pass").await;
        let now = Utc::now();
        // Warm the dummy hash so its one-off hashing does not skew the timing.
        let _ = service.login("nobody@breakingbad.com", "pass", now).await;

        let mut unknown = std::time::Duration::ZERO;
        let mut wrong = std::time::Duration::ZERO;
        for _ in 0..3 {
            let start = std::time::Instant::now();
            let _ = service.login("jesse@breakingbad.com", "pass", now).await;
            unknown += start.elapsed();

            let start = std::time::Instant::now();
            let _ = service.login("walt@breakingbad.com", "nope", now).await;
            wrong += start.elapsed();
        }

        assert!(
            wrong < unknown * 5,
            "unknown email took {unknown:?}, wrong password took {wrong:?}"
        );
    }

    #[tokio::test]
    async fn refresh_then_revoke_then_refresh() {
        let (service, user_id) = service_with_user("walt@breakingbad.com", "pass").await;
        let now = Utc::now();
        let session = service.login("walt@breakingbad.com", "pass", now).await.unwrap();

        let access = service.refresh(&session.refresh_token, now).await.unwrap();
        assert_eq!(service.jwt().validate(&access, now), Ok(user_id));

        let first = service.revoke(&session.refresh_token, now).await.unwrap();
        assert_eq!(first, RevokeOutcome::Revoked(now));

        let later = now + Duration::seconds(10);
        let second = service.revoke(&session.refresh_token, later).await.unwrap();
        assert_eq!(second, RevokeOutcome::AlreadyRevoked(now));

        assert_eq!(
            service.refresh(&session.refresh_token, later).await.unwrap_err(),
            AuthError::RevokedToken
        );
    }

    #[tokio::test]
    async fn refresh_after_expiry_is_rejected() {
        let (service, _) = service_with_user("walt@breakingbad.com", "pass").await;
        let now = Utc::now();
        let session = service.login("walt@breakingbad.com", "pass", now).await.unwrap();

        let much_later = now + Duration::days(61);
        assert_eq!(
            service.refresh(&session.refresh_token, much_later).await.unwrap_err(),
            AuthError::ExpiredToken
        );
    }

    #[tokio::test]
    async fn unknown_refresh_token() {
        let (service, _) = service_with_user("walt@breakingbad.com", "pass").await;
        let now = Utc::now();

        assert_eq!(
            service.refresh("deadbeef", now).await.unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(service.revoke("deadbeef", now).await.unwrap_err(), AuthError::NotFound);
    }

    #[tokio::test]
    async fn blocking_hash_rejects_overlong_passwords() {
        let long = "x".repeat(73);
        assert!(matches!(
            hash_password_blocking(&long).await,
            Err(PasswordError::TooLong { len: 73, .. })
        ));
    }
}
