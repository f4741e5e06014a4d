//! Response DTOs for operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::requests::SourceKind;

/// Graph growth caused by one input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStats {
    /// Vertices created while scraping the input.
    pub vertices_added: usize,
    /// Edges created while scraping the input.
    pub edges_added: usize,
    /// Hosts or plays scraped.
    pub items: usize,
}

/// Result of scraping a single input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InputStatus {
    /// The input was scraped completely.
    Scraped(InputStats),
    /// The input failed; writes made before the failure stay in the graph.
    Failed { error: String },
}

/// Outcome for one input of a scrape request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputOutcome {
    /// Input kind.
    pub kind: SourceKind,
    /// Input path as given in the request.
    pub path: PathBuf,
    /// What happened.
    #[serde(flatten)]
    pub status: InputStatus,
}

impl InputOutcome {
    /// Whether the input failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, InputStatus::Failed { .. })
    }
}

/// Response from a scrape operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeReport {
    /// Per-input outcomes in processing order.
    pub outcomes: Vec<InputOutcome>,
    /// Total vertices in the graph after the run.
    pub vertex_count: usize,
    /// Total edges in the graph after the run.
    pub edge_count: usize,
}

impl ScrapeReport {
    /// Outcomes of failed inputs.
    pub fn failed(&self) -> impl Iterator<Item = &InputOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Outcomes of successfully scraped inputs.
    pub fn succeeded(&self) -> impl Iterator<Item = &InputOutcome> {
        self.outcomes.iter().filter(|o| !o.is_failed())
    }

    /// Whether any input failed.
    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = InputOutcome {
            kind: SourceKind::Playbook,
            path: PathBuf::from("site.yml"),
            status: InputStatus::Failed {
                error: "boom".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "playbook");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn test_report_partitions_outcomes() {
        let report = ScrapeReport {
            outcomes: vec![
                InputOutcome {
                    kind: SourceKind::Inventory,
                    path: PathBuf::from("a.yml"),
                    status: InputStatus::Scraped(InputStats::default()),
                },
                InputOutcome {
                    kind: SourceKind::Inventory,
                    path: PathBuf::from("b.yml"),
                    status: InputStatus::Failed {
                        error: "missing".to_string(),
                    },
                },
            ],
            vertex_count: 0,
            edge_count: 0,
        };
        assert!(report.has_failures());
        assert_eq!(report.failed().count(), 1);
        assert_eq!(report.succeeded().count(), 1);
    }
}
