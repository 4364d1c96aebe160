pub mod parser;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

/// Listen address for the exposition endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// How and when tracker statistics are collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Snapshots older than this are refreshed on the next scrape.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Hard bound on a single tracker read.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_secs: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// One tracker to collect from. The `name` becomes the `site` label value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
}

// Default values

fn default_host() -> String {
    "0.0.0.0".to_string()
}

// crc32("bttrack") folded into the 49152-65535 dynamic port range
fn default_port() -> u16 {
    49886
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_timeout() -> u64 {
    10
}

fn default_backoff_initial() -> u64 {
    5
}

fn default_backoff_max() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            timeout_secs: default_timeout(),
            backoff_initial_secs: default_backoff_initial(),
            backoff_max_secs: default_backoff_max(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CollectorConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_secs(self.backoff_initial_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

impl Config {
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        parser::parse_config(path)
    }

    /// Minimal config for a single ad-hoc tracker URL (`dump --url ...`).
    pub fn for_single_site(url: &str) -> Self {
        Self {
            server: ServerConfig::default(),
            collector: CollectorConfig::default(),
            logging: LoggingConfig::default(),
            sites: vec![SiteConfig {
                name: "default".to_string(),
                url: url.to_string(),
            }],
        }
    }

    pub fn validate(&self) -> Result<Vec<String>> {
        validator::validate_config(self)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
