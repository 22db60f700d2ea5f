//! Logging setup
//!
//! garnet is a library first; the subscriber is installed only when a host
//! binary asks for it. Diagnostics (parse failures, unknown libraries)
//! flow through `tracing` either way.

use std::io;

use time::format_description::well_known::Rfc3339;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: stderr output with RFC 3339 UTC
/// timestamps. The level comes from `log_level` when given, otherwise
/// from `RUST_LOG`, otherwise `warn` (queries should be silent by
/// default).
pub fn init_logger(no_color: bool, log_level: Option<&str>) -> io::Result<()> {
    let filter = log_level
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_timer(UtcTime::new(Rfc3339))
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .init();

    Ok(())
}
