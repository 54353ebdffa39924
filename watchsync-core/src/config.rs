use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub rooms: RoomsConfig,
    pub media: MediaConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 3001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Room lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Evict empty rooms idle for this long. 0 keeps rooms forever.
    pub idle_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: 0,
            sweep_interval_seconds: 60,
        }
    }
}

impl RoomsConfig {
    /// `None` when eviction is disabled
    #[must_use]
    pub const fn idle_ttl(&self) -> Option<Duration> {
        if self.idle_ttl_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_ttl_seconds))
        }
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

/// Upload storage and byte-range serving
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    /// Largest range served for an open-ended `bytes=N-` request
    pub default_chunk_bytes: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_dir: "uploads".to_string(),
            max_upload_bytes: 2 * 1024 * 1024 * 1024,
            default_chunk_bytes: 1024 * 1024,
        }
    }
}

/// Third-party drive passthrough
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub drive_base_url: String,
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            drive_base_url: "https://drive.google.com/uc".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // WATCHSYNC_SERVER__HTTP_PORT, WATCHSYNC_ROOMS__IDLE_TTL_SECONDS, ...
        builder = builder.add_source(
            Environment::with_prefix("WATCHSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Resolve the config file (`WATCHSYNC_CONFIG_PATH`, then `./config.yaml`)
    /// and load it
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = std::env::var("WATCHSYNC_CONFIG_PATH")
            .ok()
            .filter(|p| Path::new(p).exists())
            .or_else(|| {
                let cwd = "config.yaml";
                Path::new(cwd).exists().then(|| cwd.to_string())
            });
        Self::load(path.as_deref())
    }

    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    /// Collect every configuration problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.host.trim().is_empty() {
            errors.push("server.host must not be empty".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }
        if self.rooms.idle_ttl_seconds > 0 && self.rooms.sweep_interval_seconds == 0 {
            errors.push("rooms.sweep_interval_seconds must be > 0 when idle_ttl_seconds is set".to_string());
        }
        if self.media.upload_dir.trim().is_empty() {
            errors.push("media.upload_dir must not be empty".to_string());
        }
        if self.media.max_upload_bytes == 0 {
            errors.push("media.max_upload_bytes must be > 0".to_string());
        }
        if self.media.default_chunk_bytes == 0 {
            errors.push("media.default_chunk_bytes must be > 0".to_string());
        }
        if url::Url::parse(&self.proxy.drive_base_url).is_err() {
            errors.push(format!(
                "proxy.drive_base_url is not a valid URL: {}",
                self.proxy.drive_base_url
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
