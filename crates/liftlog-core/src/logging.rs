//! Logging initialization for the client.

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with compact stderr output.
///
/// The filter comes from `RUST_LOG` when set, otherwise from `level`.
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("Client started");
/// ```
pub fn init_logging(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
