//! Logging setup.
//!
//! Logs go to **stderr**; stdout carries only the handshake line the host
//! reads on startup.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `debug`, `tinkerbell_provider=debug`).
//!   When unset, the provider logs at the default level and keeps the gRPC
//!   transport crates at `warn`.
//!
//! ```bash
//! # Trace every Tinkerbell call made by the provider
//! RUST_LOG=tinkerbell_provider=trace terraform apply
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Transport crates that are noisy below `warn`.
const QUIET_TARGETS: &[&str] = &["h2", "hyper", "hyper_util", "tower", "rustls", "reqwest"];

/// Filter from `RUST_LOG`, or `default_level` with the transport crates
/// quieted.
fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = std::iter::once(default_level.to_string())
            .chain(QUIET_TARGETS.iter().map(|target| format!("{}=warn", target)))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(directives)
    })
}

fn try_init_with(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(filter(default_level))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
}

/// Initialize logging at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`], with a different default level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    if let Err(e) = try_init_with(default_level) {
        panic!("failed to initialize logging: {}", e);
    }
}

/// Initialize logging, returning `false` if a subscriber was already set.
pub fn try_init_logging() -> bool {
    try_init_with("info").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("tinkerbell_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,tinkerbell_provider=debug,h2=warn").is_ok());
    }

    #[test]
    fn test_try_init_twice() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
