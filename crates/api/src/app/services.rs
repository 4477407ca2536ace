//! Storage and service wiring.

use std::path::PathBuf;
use std::sync::Arc;

use chirpy_auth::{CredentialStore, Hs256Jwt, RefreshTokenStore, SessionService, UserStore};
use chirpy_chirps::ChirpStore;
use chirpy_infra::InMemoryStore;
use chirpy_observability::RequestCounter;

use crate::config::{ApiConfig, Platform};

/// Everything handlers need, shared behind an `Arc` as a request extension.
pub struct AppServices {
    pub users: Arc<dyn UserStore>,
    pub chirps: Arc<dyn ChirpStore>,
    pub sessions: SessionService,
    pub counter: Arc<RequestCounter>,
    pub platform: Platform,
    pub static_root: PathBuf,
    polka_key: String,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("platform", &self.platform)
            .field("hits", &self.counter.get())
            .finish_non_exhaustive()
    }
}

impl AppServices {
    /// Wire every service to a single store implementing all contracts.
    pub fn with_store<S>(store: Arc<S>, config: &ApiConfig) -> Self
    where
        S: UserStore + ChirpStore + CredentialStore + RefreshTokenStore + 'static,
    {
        let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes()));
        Self {
            users: store.clone(),
            chirps: store.clone(),
            sessions: SessionService::new(store.clone(), store, jwt),
            counter: Arc::new(RequestCounter::new()),
            platform: config.platform,
            static_root: config.static_root.clone(),
            polka_key: config.polka_key.clone(),
        }
    }

    pub fn jwt(&self) -> &Arc<Hs256Jwt> {
        self.sessions.jwt()
    }

    /// Exact comparison with the configured webhook key. An unset key
    /// matches nothing.
    pub fn polka_key_matches(&self, presented: &str) -> bool {
        !self.polka_key.is_empty() && self.polka_key == presented
    }
}

/// Pick a store from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise in-memory.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    match config.database_url.as_deref() {
        None => {
            tracing::info!("using in-memory store");
            Ok(AppServices::with_store(Arc::new(InMemoryStore::new()), config))
        }
        Some(url) => connect_postgres(url, config).await,
    }
}

#[cfg(feature = "postgres")]
async fn connect_postgres(url: &str, config: &ApiConfig) -> anyhow::Result<AppServices> {
    use anyhow::Context;

    let store = chirpy_infra::PostgresStore::connect(url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::info!("using postgres store");
    Ok(AppServices::with_store(Arc::new(store), config))
}

#[cfg(not(feature = "postgres"))]
async fn connect_postgres(_url: &str, _config: &ApiConfig) -> anyhow::Result<AppServices> {
    anyhow::bail!("DATABASE_URL is set but this build lacks the `postgres` feature")
}
