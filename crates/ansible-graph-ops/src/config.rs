//! Configuration for the operations layer.

use std::path::PathBuf;

use ansible_graph_core::NestedValuePolicy;
use serde::{Deserialize, Serialize};

use crate::error::{OpsError, OpsResult};

/// Configuration for scrape operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Name of the implicit group every host belongs to; never linked.
    #[serde(default = "default_universal_group")]
    pub universal_group: String,

    /// How nested variable values are stored on vertices.
    #[serde(default)]
    pub nested_values: NestedValuePolicy,

    /// Ansible base directory; roles are looked up under `<base_dir>/roles`.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

fn default_universal_group() -> String {
    "all".to_string()
}

fn default_base_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            universal_group: default_universal_group(),
            nested_values: NestedValuePolicy::default(),
            base_dir: default_base_dir(),
        }
    }
}

impl Config {
    /// Set the base directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Set the nested value policy.
    pub fn with_nested_values(mut self, policy: NestedValuePolicy) -> Self {
        self.nested_values = policy;
        self
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> OpsResult<()> {
        if self.universal_group.trim().is_empty() {
            return Err(OpsError::Config(
                "universal_group must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
