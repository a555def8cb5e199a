use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use crate::batch::{ExecutionMode, ExecutionPolicy, MAX_CONCURRENCY};
use crate::template::MissingValuePolicy;

/// Environment variable prefix; sections and keys are joined with `__`
pub const ENV_PREFIX: &str = "WORKBENCH";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub otel: OtelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    /// When set, proxy and batch routes require a matching `X-API-Key`
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Upstream request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Upper bound applied to any requested concurrency
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Delay between rows handled by the same worker
    #[serde(default)]
    pub pacing_ms: u64,
    #[serde(default = "default_true")]
    pub coerce_loose_types: bool,
    #[serde(default)]
    pub missing_values: MissingValuePolicy,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtelConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_otel_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("api-workbench/{}", env!("CARGO_PKG_VERSION"))
}

fn default_concurrency() -> usize {
    3
}

fn default_max_concurrency() -> usize {
    MAX_CONCURRENCY
}

fn default_true() -> bool {
    true
}

fn default_max_rows() -> usize {
    10_000
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "api-workbench".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("proxy.timeout_ms", 30_000)?
            .set_default("batch.concurrency", 3)?
            .set_default("batch.pacing_ms", 0)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // WORKBENCH_SERVER__PORT, WORKBENCH_API__KEY, WORKBENCH_PROXY__TIMEOUT_MS, ...
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins"),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl BatchConfig {
    /// Execution policy for a run, honoring the configured ceiling
    pub fn policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            mode: self.mode,
            concurrency: self.concurrency.min(self.max_concurrency.max(1)),
            pacing_ms: self.pacing_ms,
        }
    }

    /// Apply per-request overrides on top of the configured policy
    pub fn policy_with(&self, mode: Option<ExecutionMode>, concurrency: Option<usize>) -> ExecutionPolicy {
        let mut policy = self.policy();
        if let Some(mode) = mode {
            policy.mode = mode;
        }
        if let Some(concurrency) = concurrency {
            policy.concurrency = concurrency.min(self.max_concurrency.max(1));
        }
        policy
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            concurrency: default_concurrency(),
            max_concurrency: default_max_concurrency(),
            pacing_ms: 0,
            coerce_loose_types: true,
            missing_values: MissingValuePolicy::default(),
            max_rows: default_max_rows(),
        }
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_otel_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);

        let batch = BatchConfig::default();
        assert_eq!(batch.concurrency, 3);
        assert_eq!(batch.max_concurrency, 10);
        assert!(batch.coerce_loose_types);
        assert_eq!(batch.missing_values, MissingValuePolicy::Null);

        assert_eq!(ProxyConfig::default().timeout_ms, 30_000);
    }

    #[test]
    fn test_environment_overrides_multi_word_keys() {
        let vars = [
            ("WORKBENCH_SERVER__PORT", "9999"),
            ("WORKBENCH_PROXY__TIMEOUT_MS", "1234"),
            ("WORKBENCH_PROXY__USER_AGENT", "custom-agent"),
            ("WORKBENCH_BATCH__MAX_ROWS", "5"),
            ("WORKBENCH_BATCH__MISSING_VALUES", "reject"),
            ("WORKBENCH_SERVER__CORS_ORIGINS", "http://a.test,http://b.test"),
        ];
        for (key, value) in vars {
            env::set_var(key, value);
        }

        let settings = Settings::new().unwrap();

        for (key, _) in vars {
            env::remove_var(key);
        }

        assert_eq!(settings.server.port, 9999);
        assert_eq!(settings.proxy.timeout_ms, 1234);
        assert_eq!(settings.proxy.user_agent, "custom-agent");
        assert_eq!(settings.batch.max_rows, 5);
        assert_eq!(settings.batch.missing_values, MissingValuePolicy::Reject);
        assert_eq!(settings.server.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn test_policy_respects_ceiling() {
        let batch = BatchConfig {
            max_concurrency: 4,
            ..BatchConfig::default()
        };
        let policy = batch.policy_with(Some(ExecutionMode::Concurrent), Some(8));
        assert_eq!(policy.concurrency, 4);
        assert_eq!(batch.policy_with(None, None).concurrency, 3);
    }
}
