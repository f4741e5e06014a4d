//! CLI configuration management.
//!
//! Supports loading configuration from environment variables, config files,
//! and CLI arguments with proper precedence: flags, then environment, then
//! the config file, then built-in defaults.

use std::path::PathBuf;

use ansible_graph_core::NestedValuePolicy;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Default address the viewer binds to.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default port the viewer listens on.
pub const DEFAULT_PORT: u16 = 8000;

/// Application-wide configuration. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address to start the web server on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Port to start the web server on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Ansible base directory used to resolve roles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    /// How nested variable values are stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_values: Option<NestedValuePolicy>,
}

impl Config {
    /// Load configuration from environment variables and config file.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        let mut config = Self::from_env()?;

        // Try to load from config file
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path).with_context(|| {
                    format!("Failed to read config from {}", config_path.display())
                })?;
                let file_config: Config = serde_json::from_str(&contents).with_context(|| {
                    format!("Failed to parse config file {}", config_path.display())
                })?;

                // File config takes lower precedence than env vars
                config.fill_from(file_config);
            }
        }

        Ok(config)
    }

    fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(address) = std::env::var("ANSIBLE_GRAPH_ADDRESS") {
            config.address = Some(address);
        }
        if let Ok(port) = std::env::var("ANSIBLE_GRAPH_PORT") {
            config.port = Some(
                port.parse()
                    .with_context(|| format!("Invalid ANSIBLE_GRAPH_PORT: {port}"))?,
            );
        }
        if let Ok(base_dir) = std::env::var("ANSIBLE_GRAPH_BASE_DIR") {
            config.base_dir = Some(PathBuf::from(base_dir));
        }
        if let Ok(policy) = std::env::var("ANSIBLE_GRAPH_NESTED_VALUES") {
            config.nested_values = Some(
                policy
                    .parse()
                    .with_context(|| format!("Invalid ANSIBLE_GRAPH_NESTED_VALUES: {policy}"))?,
            );
        }

        Ok(config)
    }

    /// Fill fields that are still unset from `other`.
    fn fill_from(&mut self, other: Config) {
        if self.address.is_none() {
            self.address = other.address;
        }
        if self.port.is_none() {
            self.port = other.port;
        }
        if self.base_dir.is_none() {
            self.base_dir = other.base_dir;
        }
        if self.nested_values.is_none() {
            self.nested_values = other.nested_values;
        }
    }

    /// Address with the default applied.
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
    }

    /// Port with the default applied.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Get the path to the config file.
    ///
    /// `ANSIBLE_GRAPH_CONFIG` overrides the platform location.
    pub fn config_file_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ANSIBLE_GRAPH_CONFIG") {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("dev", "ansible-graph", "ansible-graph")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}
