//! Request counting.
//!
//! The counter is owned by application state and handed to the request
//! layer; there is no global instance. It starts at zero, is incremented once
//! per request and can be read or reset through the admin surface.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RequestCounter {
    hits: AtomicU64,
}

impl RequestCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request; returns the new total.
    pub fn increment(&self) -> u64 {
        self.hits.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Reset to zero; returns the count before the reset.
    pub fn reset(&self) -> u64 {
        self.hits.swap(0, Ordering::Relaxed)
    }
}
