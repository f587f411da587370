//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `RUST_LOG` is not set.
pub const FALLBACK_FILTER_VAR: &str = "PAYBOOK_LOG";

const DEFAULT_FILTER: &str = "info";

/// Initialize JSON logging for the process.
///
/// The filter comes from `RUST_LOG`, then `PAYBOOK_LOG`, then `info`.
pub fn init() {
    let filter = resolve_filter(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        std::env::var(FALLBACK_FILTER_VAR).ok(),
    );

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// First directive string that parses wins; blank or invalid values are skipped.
fn resolve_filter(rust_log: Option<String>, fallback: Option<String>) -> EnvFilter {
    [rust_log, fallback]
        .into_iter()
        .flatten()
        .filter(|raw| !raw.trim().is_empty())
        .find_map(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
