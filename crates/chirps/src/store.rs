use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chirpy_core::{ChirpId, StoreResult};

use crate::chirp::{Chirp, ListChirps, NewChirp};

#[async_trait]
pub trait ChirpStore: Send + Sync {
    async fn create_chirp(&self, chirp: NewChirp, at: DateTime<Utc>) -> StoreResult<Chirp>;

    async fn chirp(&self, id: ChirpId) -> StoreResult<Option<Chirp>>;

    async fn list_chirps(&self, opts: &ListChirps) -> StoreResult<Vec<Chirp>>;

    /// Returns `false` when the chirp did not exist.
    async fn delete_chirp(&self, id: ChirpId) -> StoreResult<bool>;
}
