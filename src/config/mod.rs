mod settings;

pub use settings::{ApiConfig, BatchConfig, OtelConfig, ProxyConfig, ServerConfig, Settings};
