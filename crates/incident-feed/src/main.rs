//! Incident feed MCP server over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use incident_feed::{FeedHandler, IncidentStore};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "incident-feed")]
#[command(about = "Serve monitoring incidents as MCP tools over stdio")]
#[command(version)]
struct Cli {
    /// JSON array of incidents to serve instead of the bundled fixture
    #[arg(long, env = "INCIDENT_FEED_DATA")]
    data: Option<PathBuf>,

    /// Keep timestamps as recorded instead of shifting the newest to now
    #[arg(long, env = "INCIDENT_FEED_NO_REBASE")]
    no_rebase: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tools::logging::init("incident_feed=info,tools=info,warn");
    let cli = Cli::parse();

    let store = match &cli.data {
        Some(path) => IncidentStore::from_path(path)
            .with_context(|| format!("Failed to load incidents from {}", path.display()))?,
        None => IncidentStore::builtin().context("Failed to load bundled incidents")?,
    };
    let store = if cli.no_rebase {
        store
    } else {
        store.rebased_to(Utc::now())
    };

    info!(incidents = store.len(), "Incident feed MCP server running on stdio");
    tools::serve_stdio(Arc::new(FeedHandler::new(store)))
        .await
        .context("Serve loop failed")?;
    Ok(())
}
