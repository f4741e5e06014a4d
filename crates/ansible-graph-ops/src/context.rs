//! OpsContext - The main service for executing scrape operations.
//!
//! The context owns the shared graph that every scrape writes into and that
//! the HTTP viewer reads from. It can be used by the CLI, tests, or any other
//! consumer.

use std::path::Path;
use std::sync::Arc;

use ansible_graph_core::GraphStore;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::Config;
use crate::error::OpsResult;
use crate::inventory::YamlInventory;
use crate::model::{Inventory, Playbook};
use crate::playbook::YamlPlaybook;
use crate::requests::{ScrapeRequest, SourceKind};
use crate::responses::{InputOutcome, InputStats, InputStatus, ScrapeReport};
use crate::scrape;
use crate::schema::new_graph_store;

/// Graph handle shared between scrapers and readers.
pub type SharedGraph = Arc<RwLock<GraphStore>>;

/// The main operations context.
///
/// Cloning is cheap and every clone writes into the same graph. Each input is
/// scraped under a single write lock, so readers observe either none or all
/// of an input's contribution.
#[derive(Debug, Clone)]
pub struct OpsContext {
    /// Configuration for operations.
    pub config: Config,
    graph: SharedGraph,
}

impl OpsContext {
    /// Create a context with a fresh, empty graph.
    pub fn new(config: Config) -> OpsResult<Self> {
        config.validate()?;
        let store = new_graph_store(config.nested_values)?;
        Ok(Self {
            config,
            graph: Arc::new(RwLock::new(store)),
        })
    }

    /// Create a context writing into an existing graph.
    pub fn with_graph(config: Config, graph: SharedGraph) -> OpsResult<Self> {
        config.validate()?;
        Ok(Self { config, graph })
    }

    /// Handle to the shared graph.
    pub fn graph(&self) -> SharedGraph {
        self.graph.clone()
    }

    // =========================================================================
    // Scrape Operations
    // =========================================================================

    /// Scrape every input of `request`, inventories first.
    ///
    /// A failing input is logged and recorded in the report; the remaining
    /// inputs are still scraped. Only fatal store errors abort the run.
    pub async fn scrape(&self, request: ScrapeRequest) -> OpsResult<ScrapeReport> {
        let mut outcomes = Vec::new();

        for (kind, path) in request.inputs() {
            let result = match kind {
                SourceKind::Inventory => self.scrape_inventory_file(path).await,
                SourceKind::Playbook => self.scrape_playbook_file(path).await,
            };

            let status = match result {
                Ok(stats) => {
                    info!(
                        %kind,
                        path = %path.display(),
                        items = stats.items,
                        vertices_added = stats.vertices_added,
                        edges_added = stats.edges_added,
                        "input scraped"
                    );
                    InputStatus::Scraped(stats)
                }
                Err(err) if err.is_fatal() => {
                    error!(%kind, path = %path.display(), error = %err, "aborting scrape");
                    return Err(err);
                }
                Err(err) => {
                    error!(%kind, path = %path.display(), error = %err, "failed to scrape input");
                    InputStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };

            outcomes.push(InputOutcome {
                kind,
                path: path.clone(),
                status,
            });
        }

        let graph = self.graph.read().await;
        Ok(ScrapeReport {
            outcomes,
            vertex_count: graph.vertex_count(),
            edge_count: graph.edge_count(),
        })
    }

    /// Load and scrape one inventory file.
    pub async fn scrape_inventory_file(&self, path: &Path) -> OpsResult<InputStats> {
        let inventory = YamlInventory::load(path)?;
        self.scrape_inventory(&inventory).await
    }

    /// Load and scrape one playbook file.
    pub async fn scrape_playbook_file(&self, path: &Path) -> OpsResult<InputStats> {
        let playbook = YamlPlaybook::load(path, &self.config.base_dir)?;
        self.scrape_playbook(&playbook).await
    }

    /// Scrape an already loaded inventory.
    pub async fn scrape_inventory<I: Inventory>(&self, inventory: &I) -> OpsResult<InputStats> {
        let mut graph = self.graph.write().await;
        let (vertices, edges) = (graph.vertex_count(), graph.edge_count());

        let items = scrape::scrape_inventory(&mut graph, inventory, &self.config.universal_group)?;

        Ok(InputStats {
            vertices_added: graph.vertex_count() - vertices,
            edges_added: graph.edge_count() - edges,
            items,
        })
    }

    /// Scrape an already loaded playbook.
    pub async fn scrape_playbook<P: Playbook>(&self, playbook: &P) -> OpsResult<InputStats> {
        let mut graph = self.graph.write().await;
        let (vertices, edges) = (graph.vertex_count(), graph.edge_count());

        let items = scrape::scrape_playbook(&mut graph, playbook)?;

        Ok(InputStats {
            vertices_added: graph.vertex_count() - vertices,
            edges_added: graph.edge_count() - edges,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_missing_input_is_recorded_not_fatal() {
        let ctx = OpsContext::new(Config::default()).unwrap();
        let report = ctx
            .scrape(ScrapeRequest::new().inventory("/nonexistent/hosts.yml"))
            .await
            .unwrap();

        assert!(report.has_failures());
        assert_eq!(report.outcomes[0].path, PathBuf::from("/nonexistent/hosts.yml"));
        assert_eq!(report.vertex_count, 0);
    }

    #[tokio::test]
    async fn test_scrape_loaded_inventory() {
        let inventory = YamlInventory::parse(
            "web:\n  hosts:\n    web1:\n    web2:\n",
            "hosts.yml",
        )
        .unwrap();
        let ctx = OpsContext::new(Config::default()).unwrap();

        let stats = ctx.scrape_inventory(&inventory).await.unwrap();
        assert_eq!(stats.items, 2);
        assert_eq!(stats.vertices_added, 3);
        assert_eq!(stats.edges_added, 2);

        let again = ctx.scrape_inventory(&inventory).await.unwrap();
        assert_eq!(again.vertices_added, 0);
        assert_eq!(again.edges_added, 0);
    }

    #[tokio::test]
    async fn test_clones_share_the_graph() {
        let ctx = OpsContext::new(Config::default()).unwrap();
        let other = ctx.clone();
        let playbook = YamlPlaybook::parse("- name: p\n  hosts: all\n  tasks: [{name: t}]\n", "site.yml", ".")
            .unwrap();

        other.scrape_playbook(&playbook).await.unwrap();
        assert_eq!(ctx.graph().read().await.vertex_count(), 2);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = Config {
            universal_group: String::new(),
            ..Config::default()
        };
        assert!(OpsContext::new(config).is_err());
    }
}
