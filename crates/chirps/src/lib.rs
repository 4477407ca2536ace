//! Chirps: short messages owned by a user.
//!
//! Pure domain rules (body validation, listing order) plus the storage
//! contract. No IO, no HTTP.

pub mod chirp;
pub mod store;

pub use chirp::{sort_chirps, Chirp, ChirpBody, ListChirps, NewChirp, SortOrder, MAX_CHIRP_LENGTH};
pub use store::ChirpStore;
