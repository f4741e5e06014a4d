//! Scrape command implementation.

use anyhow::Result;
use ansible_graph_ops::{InputStatus, OpsContext, ScrapeReport, ScrapeRequest};
use tracing::debug;

/// Scrape every input and print a per-input summary.
pub async fn execute(ctx: &OpsContext, request: ScrapeRequest) -> Result<ScrapeReport> {
    debug!(
        inventories = request.inventories.len(),
        playbooks = request.playbooks.len(),
        base_dir = %ctx.config.base_dir.display(),
        "starting scrape"
    );

    let report = ctx.scrape(request).await?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &ScrapeReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            InputStatus::Scraped(stats) => println!(
                "✅ {} {}: {} item(s), +{} vertices, +{} edges",
                outcome.kind,
                outcome.path.display(),
                stats.items,
                stats.vertices_added,
                stats.edges_added
            ),
            InputStatus::Failed { error } => {
                println!("❌ {} {}: {}", outcome.kind, outcome.path.display(), error)
            }
        }
    }

    println!(
        "📊 Graph: {} vertices, {} edges",
        report.vertex_count, report.edge_count
    );
}
