//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `UniqueViolation { constraint }` |
//! | Database (foreign key violation) | `23503` | `NotFound` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed, IO, ... | N/A | `Unavailable` |
//!
//! ## Revocation
//!
//! `revoke_refresh_token` is a single conditional `UPDATE ... WHERE revoked_at
//! IS NULL`, so concurrent revokes resolve to exactly one `Revoked`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use chirpy_auth::{
    CredentialStore, Credentials, NewUser, RefreshTokenRecord, RefreshTokenStore, RevokeOutcome, User,
    UserStore,
};
use chirpy_chirps::{Chirp, ChirpStore, ListChirps, NewChirp, SortOrder};
use chirpy_core::{ChirpId, StoreError, StoreResult, UserId};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and apply the schema.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Apply the schema. Idempotent.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn credentials_by_email(&self, email: &str) -> StoreResult<Option<Credentials>> {
        let row = sqlx::query("SELECT id, hashed_password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("credentials_by_email", e))?;

        row.map(|row| {
            Ok(Credentials {
                user_id: UserId::from_uuid(row.try_get("id")?),
                password_hash: row.try_get("hashed_password")?,
            })
        })
        .transpose()
        .map_err(|e| map_sqlx_error("credentials_by_email", e))
    }
}

#[async_trait]
impl RefreshTokenStore for PostgresStore {
    #[instrument(skip_all, fields(user_id = %record.user_id), err)]
    async fn create_refresh_token(&self, record: RefreshTokenRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, created_at, updated_at, user_id, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.token)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.user_id.as_uuid())
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_refresh_token", e))?;
        Ok(())
    }

    #[instrument(skip_all, err)]
    async fn refresh_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        sqlx::query(
            r#"
            SELECT token, created_at, updated_at, user_id, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .and_then(|row| row.as_ref().map(refresh_token_from_row).transpose())
        .map_err(|e| map_sqlx_error("refresh_token", e))
    }

    #[instrument(skip(self, token), err)]
    async fn revoke_refresh_token(
        &self,
        token: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<RevokeOutcome>> {
        let revoked: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $2, updated_at = $2
            WHERE token = $1 AND revoked_at IS NULL
            RETURNING revoked_at
            "#,
        )
        .bind(token)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_refresh_token", e))?;

        if let Some(at) = revoked {
            return Ok(Some(RevokeOutcome::Revoked(at)));
        }

        // Nothing updated: either unknown, or already revoked.
        let existing: Option<Option<DateTime<Utc>>> =
            sqlx::query_scalar("SELECT revoked_at FROM refresh_tokens WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("revoke_refresh_token", e))?;

        match existing {
            None => Ok(None),
            Some(Some(at)) => Ok(Some(RevokeOutcome::AlreadyRevoked(at))),
            Some(None) => Err(StoreError::unavailable(
                "refresh token neither revoked nor revocable",
            )),
        }
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip_all, err)]
    async fn create_user(&self, user: NewUser, at: DateTime<Utc>) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password, is_chirpy_red)
            VALUES ($1, $2, $2, $3, $4, FALSE)
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
            "#,
        )
        .bind(UserId::new().as_uuid())
        .bind(at)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .and_then(|row| user_from_row(&row))
        .map_err(|e| map_sqlx_error("create_user", e))
    }

    #[instrument(skip(self), err)]
    async fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        sqlx::query(
            "SELECT id, created_at, updated_at, email, hashed_password, is_chirpy_red FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .and_then(|row| row.as_ref().map(user_from_row).transpose())
        .map_err(|e| map_sqlx_error("user", e))
    }

    #[instrument(skip(self, email, hashed_password), err)]
    async fn update_credentials(
        &self,
        id: UserId,
        email: &str,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<User> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
            "#,
        )
        .bind(id.as_uuid())
        .bind(email)
        .bind(hashed_password)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_credentials", e))?
        .ok_or(StoreError::NotFound)?;

        user_from_row(&row).map_err(|e| map_sqlx_error("update_credentials", e))
    }

    #[instrument(skip(self), err)]
    async fn set_chirpy_red(
        &self,
        id: UserId,
        is_chirpy_red: bool,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_chirpy_red = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
            "#,
        )
        .bind(id.as_uuid())
        .bind(is_chirpy_red)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .and_then(|row| row.as_ref().map(user_from_row).transpose())
        .map_err(|e| map_sqlx_error("set_chirpy_red", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_all_users(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_all_users", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ChirpStore for PostgresStore {
    #[instrument(skip_all, fields(user_id = %chirp.user_id), err)]
    async fn create_chirp(&self, chirp: NewChirp, at: DateTime<Utc>) -> StoreResult<Chirp> {
        sqlx::query(
            r#"
            INSERT INTO chirps (id, created_at, updated_at, body, user_id)
            VALUES ($1, $2, $2, $3, $4)
            RETURNING id, created_at, updated_at, body, user_id
            "#,
        )
        .bind(ChirpId::new().as_uuid())
        .bind(at)
        .bind(chirp.body.as_str())
        .bind(chirp.user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .and_then(|row| chirp_from_row(&row))
        .map_err(|e| map_sqlx_error("create_chirp", e))
    }

    #[instrument(skip(self), err)]
    async fn chirp(&self, id: ChirpId) -> StoreResult<Option<Chirp>> {
        sqlx::query("SELECT id, created_at, updated_at, body, user_id FROM chirps WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .and_then(|row| row.as_ref().map(chirp_from_row).transpose())
            .map_err(|e| map_sqlx_error("chirp", e))
    }

    #[instrument(skip(self), err)]
    async fn list_chirps(&self, opts: &ListChirps) -> StoreResult<Vec<Chirp>> {
        let sql = match opts.sort {
            SortOrder::Asc => {
                "SELECT id, created_at, updated_at, body, user_id FROM chirps \
                 WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at ASC, id ASC"
            }
            SortOrder::Desc => {
                "SELECT id, created_at, updated_at, body, user_id FROM chirps \
                 WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC"
            }
        };

        let rows = sqlx::query(sql)
            .bind(opts.author_id.map(|id| *id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_chirps", e))?;

        rows.iter()
            .map(chirp_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_chirps", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_chirp(&self, id: ChirpId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_chirp", e))?;
        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        email: row.try_get("email")?,
        hashed_password: row.try_get("hashed_password")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        is_chirpy_red: row.try_get("is_chirpy_red")?,
    })
}

fn chirp_from_row(row: &PgRow) -> Result<Chirp, sqlx::Error> {
    Ok(Chirp {
        id: ChirpId::from_uuid(row.try_get("id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        body: row.try_get("body")?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
    })
}

fn refresh_token_from_row(row: &PgRow) -> Result<RefreshTokenRecord, sqlx::Error> {
    Ok(RefreshTokenRecord {
        token: row.try_get("token")?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        expires_at: row.try_get("expires_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some("23505") => {
                    StoreError::unique(db_err.constraint().unwrap_or("unknown").to_string())
                }
                Some("23503") => StoreError::NotFound,
                _ => StoreError::unavailable(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::unavailable(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

// Run with `DATABASE_URL=postgres://... cargo test -p chirpy-infra --features postgres -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use chirpy_auth::{generate_refresh_token, USERS_EMAIL_KEY};
    use chrono::{Duration, TimeZone};

    async fn store() -> Option<PostgresStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        Some(PostgresStore::connect(&url).await.expect("failed to connect"))
    }

    // Whole seconds: timestamptz keeps microseconds only.
    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    async fn user(store: &PostgresStore) -> User {
        let email = format!("walt+{}@breakingbad.com", UserId::new());
        store
            .create_user(NewUser::new(email, "$2b$10$hash").unwrap(), t0())
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn duplicate_email_maps_to_the_named_constraint() {
        let Some(store) = store().await else { return };
        let walt = user(&store).await;

        let err = store
            .create_user(NewUser::new(walt.email.clone(), "x").unwrap(), t0())
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_of(USERS_EMAIL_KEY), "unexpected error: {err:?}");
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn refresh_token_for_missing_user_is_not_found() {
        let Some(store) = store().await else { return };
        let record = RefreshTokenRecord::issue(generate_refresh_token().unwrap(), UserId::new(), t0());

        assert_eq!(store.create_refresh_token(record).await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn revoke_is_idempotent() {
        let Some(store) = store().await else { return };
        let walt = user(&store).await;
        let token = generate_refresh_token().unwrap();
        store
            .create_refresh_token(RefreshTokenRecord::issue(token.clone(), walt.id, t0()))
            .await
            .unwrap();

        let first = store.revoke_refresh_token(&token, t0()).await.unwrap();
        let second = store
            .revoke_refresh_token(&token, t0() + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(first, Some(RevokeOutcome::Revoked(t0())));
        assert_eq!(second, Some(RevokeOutcome::AlreadyRevoked(t0())));

        let stored = store.refresh_token(&token).await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(t0()));
        assert!(store.revoke_refresh_token("unknown", t0()).await.unwrap().is_none());
    }
}
