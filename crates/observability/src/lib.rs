//! Tracing and logging setup shared by stockroom binaries and tests.

/// Initialize process-wide logging with the format from `STOCKROOM_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    let format = std::env::var(logging::ENV_LOG_FORMAT)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();
    tracing::init(format);
}

/// Log output formats.
pub mod logging;

/// Subscriber installation (filters, layers).
pub mod tracing;

pub use logging::LogFormat;
