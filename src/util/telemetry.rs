//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Install the default env-filtered fmt subscriber unless one is set.
///
/// Embedding applications keep whatever subscriber they already installed;
/// this helper is for binaries and test harnesses that have none. Filtering
/// follows `RUST_LOG`, and falls back to `info` for this crate so pool
/// creation and rejection events are visible out of the box. Safe to call
/// more than once.
///
/// ```
/// prometheus_ripcord::util::init_tracing();
/// prometheus_ripcord::util::init_tracing();
/// ```
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("prometheus_ripcord=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
