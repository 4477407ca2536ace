use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use chirpy_auth::{
    CredentialStore, Credentials, NewUser, RefreshTokenRecord, RefreshTokenStore, RevokeOutcome, User,
    UserStore, USERS_EMAIL_KEY,
};
use chirpy_chirps::{sort_chirps, Chirp, ChirpStore, ListChirps, NewChirp};
use chirpy_core::{ChirpId, StoreError, StoreResult, UserId};

const REFRESH_TOKENS_PKEY: &str = "refresh_tokens_pkey";

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    chirps: HashMap<ChirpId, Chirp>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

/// In-memory implementation of every store contract.
///
/// All tables sit behind one lock, so each operation is atomic with respect
/// to every other. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::unavailable("lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let tables = self.read()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email)
            .map(|u| Credentials {
                user_id: u.id,
                password_hash: u.hashed_password.clone(),
            }))
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&record.user_id) {
            return Err(StoreError::NotFound);
        }
        if tables.refresh_tokens.contains_key(&record.token) {
            return Err(StoreError::unique(REFRESH_TOKENS_PKEY));
        }
        tables.refresh_tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn refresh_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self.read()?.refresh_tokens.get(token).cloned())
    }

    async fn revoke_refresh_token(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<RevokeOutcome>> {
        let mut tables = self.write()?;
        Ok(tables.refresh_tokens.get_mut(token).map(|r| r.revoke(at)))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser, at: DateTime<Utc>) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables.email_taken(&user.email, None) {
            return Err(StoreError::unique(USERS_EMAIL_KEY));
        }

        let created = User {
            id: UserId::new(),
            email: user.email,
            hashed_password: user.hashed_password,
            created_at: at,
            updated_at: at,
            is_chirpy_red: false,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn update_credentials(
        &self,
        id: UserId,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<User> {
        let mut tables = self.write()?;
        if tables.email_taken(email, Some(id)) {
            return Err(StoreError::unique(USERS_EMAIL_KEY));
        }

        let user = tables.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = at;
        Ok(user.clone())
    }

    async fn set_chirpy_red(
        &self,
        id: UserId,
        is_chirpy_red: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.write()?;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.is_chirpy_red = is_chirpy_red;
            user.updated_at = at;
            user.clone()
        }))
    }

    async fn delete_all_users(&self) -> StoreResult<u64> {
        let mut tables = self.write()?;
        let removed = tables.users.len() as u64;
        tables.users.clear();
        tables.chirps.clear();
        tables.refresh_tokens.clear();
        debug!(removed, "deleted all users");
        Ok(removed)
    }
}

#[async_trait]
impl ChirpStore for InMemoryStore {
    async fn create_chirp(&self, chirp: NewChirp, at: DateTime<Utc>) -> StoreResult<Chirp> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&chirp.user_id) {
            return Err(StoreError::NotFound);
        }

        let created = Chirp {
            id: ChirpId::new(),
            created_at: at,
            updated_at: at,
            body: chirp.body.into_inner(),
            user_id: chirp.user_id,
        };
        tables.chirps.insert(created.id, created.clone());
        Ok(created)
    }

    async fn chirp(&self, id: ChirpId) -> StoreResult<Option<Chirp>> {
        Ok(self.read()?.chirps.get(&id).cloned())
    }

    async fn list_chirps(&self, opts: &ListChirps) -> StoreResult<Vec<Chirp>> {
        let mut chirps: Vec<Chirp> = self.read()?.chirps.values().cloned().collect();
        sort_chirps(&mut chirps, opts);
        Ok(chirps)
    }

    async fn delete_chirp(&self, id: ChirpId) -> StoreResult<bool> {
        Ok(self.write()?.chirps.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chirpy_auth::generate_refresh_token;
    use chirpy_chirps::{ChirpBody, SortOrder};
    use chrono::Duration;
    use std::sync::Arc;

    async fn user(store: &InMemoryStore, email: &str) -> User {
        store
            .create_user(NewUser::new(email, "$2b$10$hash").unwrap(), Utc::now())
            .await
            .unwrap()
    }

    async fn chirp(store: &InMemoryStore, user_id: UserId, at: DateTime<Utc>) -> Chirp {
        let new = NewChirp {
            body: ChirpBody::parse("Gale!").unwrap(),
            user_id,
        };
        store.create_chirp(new, at).await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_a_named_unique_violation() {
        let store = InMemoryStore::new();
        user(&store, "walt@breakingbad.com").await;

        let err = store
            .create_user(NewUser::new("walt@breakingbad.com", "x").unwrap(), Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_of(USERS_EMAIL_KEY));
    }

    #[tokio::test]
    async fn credentials_lookup_by_email() {
        let store = InMemoryStore::new();
        let walt = user(&store, "walt@breakingbad.com").await;

        let creds = store.credentials_by_email("walt@breakingbad.com").await.unwrap().unwrap();
        assert_eq!(creds.user_id, walt.id);
        assert_eq!(creds.password_hash, "$2b$10$hash");
        assert!(store.credentials_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_credentials_rejects_someone_elses_email() {
        let store = InMemoryStore::new();
        let walt = user(&store, "walt@breakingbad.com").await;
        user(&store, "jesse@breakingbad.com").await;

        let err = store
            .update_credentials(walt.id, "jesse@breakingbad.com", "h", Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_of(USERS_EMAIL_KEY));

        let same = store
            .update_credentials(walt.id, "walt@breakingbad.com", "h2", Utc::now())
            .await
            .unwrap();
        assert_eq!(same.hashed_password, "h2");
    }

    #[tokio::test]
    async fn concurrent_revokes_revoke_exactly_once() {
        let store = Arc::new(InMemoryStore::new());
        let walt = user(&store, "walt@breakingbad.com").await;
        let token = generate_refresh_token().unwrap();
        store
            .create_refresh_token(RefreshTokenRecord::issue(token.clone(), walt.id, Utc::now()))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                store
                    .revoke_refresh_token(&token, Utc::now() + Duration::seconds(i))
                    .await
                    .unwrap()
                    .unwrap()
            }));
        }

        let mut revoked = 0;
        for h in handles {
            if matches!(h.await.unwrap(), RevokeOutcome::Revoked(_)) {
                revoked += 1;
            }
        }
        assert_eq!(revoked, 1);
    }

    #[tokio::test]
    async fn revoking_unknown_token_reports_none() {
        let store = InMemoryStore::new();
        assert!(store.revoke_refresh_token("nope", Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let store = InMemoryStore::new();
        let walt = user(&store, "walt@breakingbad.com").await;
        let jesse = user(&store, "jesse@breakingbad.com").await;
        let t = Utc::now();
        chirp(&store, walt.id, t).await;
        chirp(&store, jesse.id, t + Duration::seconds(1)).await;
        chirp(&store, walt.id, t + Duration::seconds(2)).await;

        let all = store.list_chirps(&ListChirps::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let walts = store
            .list_chirps(&ListChirps {
                author_id: Some(walt.id),
                sort: SortOrder::Desc,
            })
            .await
            .unwrap();
        assert_eq!(walts.len(), 2);
        assert_eq!(walts[0].created_at, t + Duration::seconds(2));
    }

    #[tokio::test]
    async fn delete_all_users_cascades() {
        let store = InMemoryStore::new();
        let walt = user(&store, "walt@breakingbad.com").await;
        chirp(&store, walt.id, Utc::now()).await;
        let token = generate_refresh_token().unwrap();
        store
            .create_refresh_token(RefreshTokenRecord::issue(token.clone(), walt.id, Utc::now()))
            .await
            .unwrap();

        assert_eq!(store.delete_all_users().await.unwrap(), 1);
        assert!(store.user(walt.id).await.unwrap().is_none());
        assert!(store.list_chirps(&ListChirps::default()).await.unwrap().is_empty());
        assert!(store.refresh_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chirps_need_an_existing_author() {
        let store = InMemoryStore::new();
        let new = NewChirp {
            body: ChirpBody::parse("Say my name.").unwrap(),
            user_id: UserId::new(),
        };
        assert_eq!(store.create_chirp(new, Utc::now()).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn set_chirpy_red_on_missing_user() {
        let store = InMemoryStore::new();
        assert!(store.set_chirpy_red(UserId::new(), true, Utc::now()).await.unwrap().is_none());

        let walt = user(&store, "walt@breakingbad.com").await;
        let upgraded = store.set_chirpy_red(walt.id, true, Utc::now()).await.unwrap().unwrap();
        assert!(upgraded.is_chirpy_red);
    }
}
