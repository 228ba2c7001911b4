//! Logging setup for the Parley binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Library crates whose logs are enabled alongside the binary.
const WORKSPACE_CRATES: [&str; 3] = ["parley_shared", "parley_server", "parley_client"];

/// Build the default `EnvFilter` directive used when `RUST_LOG` is unset.
///
/// Every workspace library crate and the binary itself get `default_log_level`.
/// A binary named like one of the library crates is listed once.
pub fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let binary_target = binary_name.replace('-', "_");
    let mut targets: Vec<String> = WORKSPACE_CRATES.iter().map(|c| c.to_string()).collect();
    if !targets.contains(&binary_target) {
        targets.push(binary_target);
    }
    targets
        .iter()
        .map(|target| format!("{target}={default_log_level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "parley-server", "parley-client")
/// * `default_log_level` - The default log level (e.g., "debug", "info", "warn", "error")
///
/// # Examples
///
/// ```no_run
/// use parley_shared::logger::setup_logger;
///
/// setup_logger("parley-server", "debug");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
