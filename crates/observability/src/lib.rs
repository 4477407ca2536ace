//! Tracing, logging and request metrics (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, output format).
pub mod tracing;

/// In-process request metrics.
pub mod metrics;

pub use metrics::RequestCounter;
