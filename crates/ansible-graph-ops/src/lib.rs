//! Ansible-Graph Operations Layer
//!
//! This crate loads Ansible inventories and playbooks and scrapes them into
//! the shared property graph from `ansible-graph-core`. It is consumed by
//! the CLI and the HTTP viewer alike.
//!
//! ## Architecture
//!
//! - **Model**: collaborator traits describing resolved inventories and
//!   playbooks; the YAML loaders implement them
//! - **Scrapers**: turn model objects into `HOST`, `GROUP`, `PLAY` and `TASK`
//!   vertices
//! - **OpsContext**: runs a scrape request against one shared graph and
//!   reports per-input outcomes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ansible_graph_ops::{Config, OpsContext, ScrapeRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = OpsContext::new(Config::default())?;
//!
//!     let request = ScrapeRequest::new()
//!         .inventory("inventory/hosts.yml")
//!         .playbook("site.yml");
//!     let report = ctx.scrape(request).await?;
//!
//!     println!("{} vertices, {} edges", report.vertex_count, report.edge_count);
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod inventory;
mod model;
mod playbook;
mod requests;
mod responses;
mod schema;
pub mod scrape;

// Re-export public API
pub use config::Config;
pub use context::{OpsContext, SharedGraph};
pub use error::{OpsError, OpsResult};
pub use inventory::{GroupRef, HostRef, YamlInventory};
pub use model::{Group, Host, Inventory, Play, Playbook, Task};
pub use playbook::{PlayData, TaskData, YamlPlaybook};
pub use requests::*;
pub use responses::*;
pub use schema::{new_graph_store, EdgeLabel, VertexLabel, GROUP_NAMES, KEY_ATTRIBUTE};
