use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration for a gateway stage process. Loaded once at
/// startup via [`AppConfig::load_from_env`]; every field can be overridden
/// by an environment variable under the `GATEWAY__` prefix (e.g.
/// `GATEWAY__LLM__API_KEY`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub policy: PolicyConfig,
    pub downstream: DownstreamConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables under `GATEWAY__`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_env("GATEWAY")
    }

    /// Load configuration from environment with a custom prefix.
    pub fn load_from_env(prefix: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", 4)?
            .set_default("llm.provider", "openai")?
            .set_default("llm.model", "gpt-3.5-turbo")?
            .set_default("llm.api_key", "")?
            .set_default("llm.base_url", Option::<String>::None)?
            .set_default("llm.max_tokens", 4096)?
            .set_default("llm.temperature", 0.7)?
            .set_default("policy.default_moderation", "moderate")?
            .set_default("policy.toxicity_threshold", 0.7)?
            .set_default("policy.service_name", "gateway")?
            .set_default("downstream.sentinel_url", "http://127.0.0.1:8081")?
            .set_default("downstream.guardian_url", "http://127.0.0.1:8082")?
            .set_default("downstream.gateway_to_sentinel_timeout_secs", 60)?
            .set_default("downstream.sentinel_to_model_timeout_secs", 60)?
            .set_default("downstream.sentinel_to_guardian_timeout_secs", 30)?
            .set_default("telemetry.enabled", true)?
            .set_default("telemetry.otlp_endpoint", Option::<String>::None)?
            .set_default("telemetry.service_name", "gateway")?;

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load configuration from a file, then let environment variables
    /// override individual keys.
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("GATEWAY").separator("__"));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

/// HTTP server bind configuration, shared by all three stage binaries.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl ServerConfig {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }

    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get().max(1)
}

/// Model provider credentials and defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl LlmConfig {
    pub fn new(provider: String, model: String, api_key: String) -> Self {
        Self {
            provider,
            model,
            api_key,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.7
}

/// Policy defaults applied when a request omits the corresponding setting.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_moderation")]
    pub default_moderation: String,
    #[serde(default = "default_toxicity_threshold")]
    pub toxicity_threshold: f64,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_moderation() -> String {
    "moderate".to_string()
}

fn default_toxicity_threshold() -> f64 {
    0.7
}

fn default_service_name() -> String {
    "gateway".to_string()
}

/// URLs and timeouts for the internal Gateway -> Sentinel -> Guardian hops.
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamConfig {
    pub sentinel_url: String,
    pub guardian_url: String,
    #[serde(default = "default_gateway_to_sentinel_timeout")]
    pub gateway_to_sentinel_timeout_secs: u64,
    #[serde(default = "default_sentinel_to_model_timeout")]
    pub sentinel_to_model_timeout_secs: u64,
    #[serde(default = "default_sentinel_to_guardian_timeout")]
    pub sentinel_to_guardian_timeout_secs: u64,
}

impl DownstreamConfig {
    pub fn gateway_to_sentinel_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_to_sentinel_timeout_secs)
    }

    pub fn sentinel_to_model_timeout(&self) -> Duration {
        Duration::from_secs(self.sentinel_to_model_timeout_secs)
    }

    pub fn sentinel_to_guardian_timeout(&self) -> Duration {
        Duration::from_secs(self.sentinel_to_guardian_timeout_secs)
    }
}

fn default_gateway_to_sentinel_timeout() -> u64 {
    60
}

fn default_sentinel_to_model_timeout() -> u64 {
    60
}

fn default_sentinel_to_guardian_timeout() -> u64 {
    30
}

/// Telemetry transport configuration; the core itself only emits typed
/// events, this just tells the binary where to ship them.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_telemetry_service_name")]
    pub service_name: String,
}

fn default_telemetry_service_name() -> String {
    "gateway".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_address() {
        let config = ServerConfig::new().with_host("127.0.0.1".to_string()).with_port(3000);
        assert_eq!(config.address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.workers > 0);
    }

    #[test]
    fn test_llm_config_creation() {
        let config = LlmConfig::new(
            "openai".to_string(),
            "gpt-3.5-turbo".to_string(),
            "sk-test".to_string(),
        )
        .with_base_url("https://api.openai.com/v1".to_string());

        assert_eq!(config.provider, "openai");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.base_url.as_deref(), Some("https://api.openai.com/v1"));
    }

    #[test]
    fn test_downstream_timeouts() {
        let config = DownstreamConfig {
            sentinel_url: "http://localhost:8081".to_string(),
            guardian_url: "http://localhost:8082".to_string(),
            gateway_to_sentinel_timeout_secs: 60,
            sentinel_to_model_timeout_secs: 60,
            sentinel_to_guardian_timeout_secs: 30,
        };

        assert_eq!(config.gateway_to_sentinel_timeout(), Duration::from_secs(60));
        assert_eq!(config.sentinel_to_guardian_timeout(), Duration::from_secs(30));
    }
}
