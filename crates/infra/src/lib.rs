//! `chirpy-infra`: storage implementations.
//!
//! [`memory::InMemoryStore`] backs tests and local development.
//! [`postgres::PostgresStore`] (feature `postgres`) is the persistent store.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
