//! Ansible-Graph CLI - Scrape Ansible inventories and playbooks into a graph.
//!
//! Hosts, groups, plays and tasks become vertices; group membership, group
//! nesting and play tasks become edges. The graph can be browsed with the
//! built-in read-only web viewer.

use std::path::PathBuf;

use anyhow::Result;
use ansible_graph_core::NestedValuePolicy;
use ansible_graph_ops::{Config as OpsConfig, OpsContext, ScrapeRequest};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::Config;

/// Ansible-Graph - Scrape Ansible inventories and playbooks into a graph.
#[derive(Parser, Debug)]
#[command(
    name = "ansible-graph",
    author,
    version,
    about = "Ansible-Graph: Scrape Ansible inventories and playbooks into a property graph",
    long_about = None
)]
struct Cli {
    /// Ansible base directory used to resolve roles (default: current directory).
    #[arg(short, long)]
    base_dir: Option<PathBuf>,

    /// Inventory files to scrape.
    #[arg(short, long, num_args = 0..)]
    inventories: Vec<PathBuf>,

    /// Playbook files to scrape.
    #[arg(short, long, num_args = 0..)]
    playbooks: Vec<PathBuf>,

    /// Start the web viewer after scraping.
    #[arg(long)]
    runserver: bool,

    /// Address to start the web server on (default: 0.0.0.0).
    #[arg(long)]
    address: Option<String>,

    /// Port to start the web server on (default: 8000).
    #[arg(long)]
    port: Option<u16>,

    /// How nested variables are stored: preserve, flatten or reject.
    #[arg(long)]
    nested_values: Option<NestedValuePolicy>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity; RUST_LOG takes precedence
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN // Default to less noise
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // Load configuration
    let config = Config::load()?;

    let base_dir = match cli.base_dir.or_else(|| config.base_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let nested_values = cli
        .nested_values
        .or(config.nested_values)
        .unwrap_or_default();

    let ctx = OpsContext::new(
        OpsConfig::default()
            .with_base_dir(base_dir)
            .with_nested_values(nested_values),
    )?;

    let request = ScrapeRequest {
        inventories: cli.inventories,
        playbooks: cli.playbooks,
    };
    let report = commands::scrape::execute(&ctx, request).await?;

    if cli.runserver {
        let address = cli.address.unwrap_or_else(|| config.address().to_string());
        let port = cli.port.unwrap_or_else(|| config.port());
        commands::serve::execute(ctx.graph(), &address, port).await?;
    } else if report.has_failures() {
        anyhow::bail!("{} input(s) failed to scrape", report.failed().count());
    }

    Ok(())
}
