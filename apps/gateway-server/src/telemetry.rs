//! Telemetry initialization (logging and tracing)
//!
//! Delegates to `gateway_observability`'s tracing setup so every stage
//! binary (gateway, sentinel, guardian) configures logging the same way.

use anyhow::{Context, Result};
use gateway_observability::{init_tracing_simple, TracingConfig};
use tracing::Level;

use crate::cli::Args;

/// Guards that must be kept alive for the duration of the program
pub struct TelemetryGuards;

/// Initialize telemetry stack (logging)
pub fn init_telemetry(args: &Args) -> Result<TelemetryGuards> {
    let config = TracingConfig {
        service_name: "gateway".to_string(),
        environment: args.env.clone(),
        json_logs: args.json_logs,
        log_level: args.log_level.clone(),
        colored_output: !args.json_logs,
        ..TracingConfig::default()
    };

    init_tracing_simple(&config).context("failed to initialize tracing")?;

    Ok(TelemetryGuards)
}

/// Helper to get the current log level
pub fn get_log_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_level() {
        assert_eq!(get_log_level("trace"), Level::TRACE);
        assert_eq!(get_log_level("debug"), Level::DEBUG);
        assert_eq!(get_log_level("info"), Level::INFO);
        assert_eq!(get_log_level("warn"), Level::WARN);
        assert_eq!(get_log_level("error"), Level::ERROR);
        assert_eq!(get_log_level("invalid"), Level::INFO);
    }
}
