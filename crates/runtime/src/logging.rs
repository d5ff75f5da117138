use std::str::FromStr;

use tracing_subscriber::EnvFilter;

pub fn default_log_filter() -> String {
    "info,wallet_flow=debug,runtime=debug".to_string()
}

/// Installs the process-wide subscriber. `log_filter` takes precedence over
/// `RUST_LOG`; an invalid filter falls back to [`default_log_filter`].
/// Installing twice is harmless, the second call only logs.
pub fn init_logging(log_filter: Option<&str>) -> anyhow::Result<()> {
    let filter = match log_filter {
        Some(filter) => EnvFilter::from_str(filter).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(default_log_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .unwrap_or_else(|error| tracing::info!("Error installing logger: {}", error));

    Ok(())
}

pub fn init_logging_test() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .unwrap_or_else(|error| tracing::info!("Error installing logger: {}", error));
}
