//! Structured logging initialization and service counters.
//!
//! Logging goes through `tracing` with an `EnvFilter` (`RUST_LOG`,
//! defaulting to `info`). The counters here are process-wide monotonic
//! totals kept on relaxed atomics; they are cheap enough to update on every
//! request and are read by operators through logs and by tests through the
//! getter functions.

use portable_atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static VENDOR_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once: later calls (e.g., from parallel tests)
/// leave the existing subscriber in place.
pub fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub fn increment_requests() {
    REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn get_requests() -> u64 {
    REQUESTS_TOTAL.load(Ordering::Relaxed)
}

pub fn increment_vendor_failures() {
    VENDOR_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn get_vendor_failures() -> u64 {
    VENDOR_FAILURES_TOTAL.load(Ordering::Relaxed)
}
