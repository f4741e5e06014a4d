//! Request DTOs for operations.
//!
//! A scrape request lists every input of one run, so the same run can be
//! driven from the CLI, a test, or programmatically.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of a scrape input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An inventory file.
    Inventory,
    /// A playbook file.
    Playbook,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Inventory => write!(f, "inventory"),
            SourceKind::Playbook => write!(f, "playbook"),
        }
    }
}

/// Request to scrape inventories and playbooks into the shared graph.
///
/// Inventories are processed before playbooks, each list in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// Inventory files.
    #[serde(default)]
    pub inventories: Vec<PathBuf>,

    /// Playbook files.
    #[serde(default)]
    pub playbooks: Vec<PathBuf>,
}

impl ScrapeRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an inventory file.
    pub fn inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventories.push(path.into());
        self
    }

    /// Add a playbook file.
    pub fn playbook(mut self, path: impl Into<PathBuf>) -> Self {
        self.playbooks.push(path.into());
        self
    }

    /// Whether the request has no inputs.
    pub fn is_empty(&self) -> bool {
        self.inventories.is_empty() && self.playbooks.is_empty()
    }

    /// Inputs in processing order.
    pub fn inputs(&self) -> impl Iterator<Item = (SourceKind, &PathBuf)> {
        self.inventories
            .iter()
            .map(|p| (SourceKind::Inventory, p))
            .chain(self.playbooks.iter().map(|p| (SourceKind::Playbook, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_order_inventories_first() {
        let request = ScrapeRequest::new()
            .playbook("site.yml")
            .inventory("hosts.yml")
            .inventory("prod.yml");

        let kinds: Vec<_> = request.inputs().map(|(kind, path)| (kind, path.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (SourceKind::Inventory, PathBuf::from("hosts.yml")),
                (SourceKind::Inventory, PathBuf::from("prod.yml")),
                (SourceKind::Playbook, PathBuf::from("site.yml")),
            ]
        );
        assert!(!request.is_empty());
        assert!(ScrapeRequest::new().is_empty());
    }
}
