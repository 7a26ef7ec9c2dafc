use config::{Config as ConfigLoader, ConfigError, Environment, File};
use datafeed_ndjson::KeySpec;
use datafeed_status::StatusConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub status: StatusConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request timeout for everything except the status channel
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// Entity property used as the NDJSON row key
    #[serde(default = "default_key_property")]
    pub key_property: String,
    /// Optional namespace rendered as `<prefix>.<key>`
    #[serde(default)]
    pub key_prefix: Option<String>,
}

fn default_key_property() -> String {
    datafeed_ndjson::DEFAULT_KEY_PROPERTY.to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            key_property: default_key_property(),
            key_prefix: None,
        }
    }
}

impl StreamConfig {
    pub fn key_spec(&self) -> KeySpec {
        KeySpec::Property {
            name: self.key_property.clone(),
            prefix: self.key_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (DATAFEED_<SECTION>__<KEY>)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything (DATAFEED_SERVER__PORT=8080)
            .add_source(
                Environment::with_prefix("DATAFEED")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Route of the status channel, `<event_prefix>/status`
    pub fn status_route(&self) -> String {
        let prefix = self.status.event_prefix.trim_end_matches('/');
        if prefix.starts_with('/') {
            format!("{}/status", prefix)
        } else {
            format!("/{}/status", prefix).replace("//", "/")
        }
    }
}
