//! Serve command implementation.
//!
//! Serves the scraped graph read-only:
//!
//! - `/` - HTML listing of vertices and edges
//! - `/api/*` - JSON endpoints (via ansible-graph-api)

use anyhow::{Context, Result};
use ansible_graph_api::{create_api_state, create_viewer_router};
use ansible_graph_ops::SharedGraph;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Execute the serve command; runs until Ctrl+C.
pub async fn execute(graph: SharedGraph, address: &str, port: u16) -> Result<()> {
    let app = create_viewer_router(create_api_state(graph));

    let listener = TcpListener::bind((address, port))
        .await
        .with_context(|| format!("Failed to bind {address}:{port}"))?;
    let local = listener.local_addr()?;

    // Print server info
    println!();
    println!("🚀 Ansible Graph Server");
    println!("   URL: http://{local}");
    println!("   API: http://{local}/api/health");
    println!();
    println!("   Press Ctrl+C to stop");
    println!();

    info!(%local, "viewer listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("viewer stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
