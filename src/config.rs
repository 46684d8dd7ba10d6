use std::{path::Path, time::Duration};

use anyhow::Context;
use log::LevelFilter;
use serde::Deserialize;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9090";

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub publish: PublishConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&contents).with_context(|| "Failed to parse config TOML")?;
        anyhow::ensure!(
            cfg.version == 1,
            "Unsupported config version {}",
            cfg.version
        );
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            channel: ChannelConfig::default(),
            logging: LoggingConfig::default(),
            publish: PublishConfig::default(),
            mqtt: MqttConfig::default(),
        }
    }
}

fn default_version() -> u32 {
    1
}

/// Media server the bridge talks to
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    /// Read/write timeout of field query connections, none when absent
    pub query_timeout_ms: Option<u64>,
}

impl ServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            query_timeout_ms: None,
        }
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(default_address())
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

/// Stream of tracks between the listener and the publisher
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// How long a push waits on a full stream before dropping the track
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
}

impl ChannelConfig {
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            push_timeout_ms: default_push_timeout_ms(),
        }
    }
}

fn default_capacity() -> usize {
    64
}

fn default_push_timeout_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl LoggingConfig {
    /// Level to log at, `debug` forces [`LevelFilter::Debug`] at least
    pub fn level_filter(&self, debug: bool) -> anyhow::Result<LevelFilter> {
        let level: LevelFilter = self
            .level
            .parse()
            .with_context(|| format!("Invalid log level '{}'", self.level))?;

        Ok(if debug {
            level.max(LevelFilter::Debug)
        } else {
            level
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PublishConfig {
    /// File tracks are appended to, stdout when absent
    pub path: Option<std::path::PathBuf>,
    #[serde(default)]
    pub pretty: bool,
}

/// Message broker tracks are published to, instead of the local sink when
/// `broker` is set
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    /// `tcp://host:port`, `host:port` or `host`
    pub broker: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub qos: u8,
    #[serde(default)]
    pub retain: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker: None,
            client_id: default_client_id(),
            topic: String::new(),
            qos: 0,
            retain: false,
            username: None,
            password: None,
        }
    }
}

fn default_client_id() -> String {
    "lmsbridge".to_string()
}
