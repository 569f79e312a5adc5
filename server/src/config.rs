use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    /// Keep records in memory only; nothing survives a restart
    #[serde(default)]
    pub in_memory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://./resume-cache.db".to_string(),
                max_connections: Some(5),
                in_memory: false,
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
        }
    }
}

impl Config {
    /// Read the config file, writing the defaults there first if it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(path, contents)
                .with_context(|| format!("writing {}", path.display()))?;
            Ok(default_config)
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }
}
