//! Application state and initialization

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use gateway_adapters::model_client::HttpModelClient;
use gateway_api::state::{CredentialLookupAdapter, UsageAccountingAdapter};
use gateway_core::config::AppConfig;
use gateway_guardian::Guardian;
use gateway_observability::GatewayMetrics;
use gateway_security::credential::{InMemoryCredentialStore, InMemoryUsageCounterStore};
use gateway_security::rate_limit::RateLimitManager;
use gateway_security::TracingAuditLogger;
use gateway_sentinel::Sentinel;

use crate::cli::Args;
use crate::server::Server;

/// Shared application state: the gateway config plus the constructed
/// `gateway_api::AppState` the HTTP router runs against.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api_state: Arc<gateway_api::AppState>,
}

impl AppState {
    /// Create a new application state with all dependencies
    pub async fn new(args: &Args) -> Result<Self> {
        info!("Initializing application components");

        let config = AppConfig::load_from_file(
            args.config
                .to_str()
                .context("config path is not valid UTF-8")?,
        )
        .or_else(|_| AppConfig::load())
        .context("failed to load gateway configuration")?;

        let model_client = Arc::new(HttpModelClient::new(
            config.llm.base_url.clone().unwrap_or_default(),
            config.llm.api_key.clone(),
            Duration::from_secs(config.downstream.sentinel_to_model_timeout_secs),
        ));

        let api_state = Arc::new(gateway_api::AppState {
            credentials: Arc::new(CredentialLookupAdapter(InMemoryCredentialStore::new())),
            usage: Arc::new(UsageAccountingAdapter(InMemoryUsageCounterStore::new())),
            audit: Arc::new(TracingAuditLogger),
            model_client,
            sentinel: Sentinel::new(),
            guardian: Guardian::new(),
            metrics: Arc::new(GatewayMetrics::new()),
            sentinel_timeout: config.downstream.gateway_to_sentinel_timeout(),
            guardian_timeout: config.downstream.sentinel_to_guardian_timeout(),
            rate_limiter: Arc::new(RateLimitManager::default_config()),
        });

        Ok(Self {
            config: Arc::new(config),
            api_state,
        })
    }
}

/// Main application
pub struct App {
    args: Args,
    state: AppState,
}

impl App {
    /// Build the application with all dependencies
    pub async fn build(args: Args) -> Result<Self> {
        // Validate arguments
        args.validate().context("Invalid command line arguments")?;

        // Initialize application state
        let state = AppState::new(&args).await?;

        Ok(Self { args, state })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        info!("Starting server");
        info!("HTTP port: {}", self.args.port);

        // Create and run server
        let server = Server::new(self.args, self.state)?;
        server.run().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_app_state_creation() {
        let args = Args::parse_from(["gateway-server", "--config", "does/not/exist.toml"]);
        let result = AppState::new(&args).await;
        assert!(result.is_ok());
    }
}
