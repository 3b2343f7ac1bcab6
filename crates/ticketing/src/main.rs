//! Ticketing MCP server over stdio.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ticketing::{FileTicketLedger, GitHubClient, TicketService, TicketingConfig, TicketingHandler};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ticketing")]
#[command(about = "Serve deduplicated GitHub incident tickets as MCP tools over stdio")]
#[command(version)]
struct Cli {
    /// Repository to file tickets in (owner/repo)
    #[arg(long, env = "TICKETING_REPOSITORY")]
    repository: Option<String>,

    /// GitHub token with issues write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    github_api_url: Option<String>,

    /// Dedup ledger file
    #[arg(long, env = "TICKETING_LEDGER")]
    ledger: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tools::logging::init("ticketing=info,tools=info,warn");
    let cli = Cli::parse();

    let config = TicketingConfig::from_parts(
        cli.repository.as_deref(),
        cli.github_token.as_deref(),
        cli.github_api_url.as_deref(),
        cli.ledger,
    )
    .context("Invalid ticketing configuration")?;

    let ledger = FileTicketLedger::open(&config.ledger_path)
        .await
        .context("Failed to open dedup ledger")?;
    let tracker = GitHubClient::new(&config.api_url, &config.token, config.repository.clone())
        .context("Failed to build GitHub client")?;
    let service = TicketService::new(
        config.repository.clone(),
        Arc::new(tracker),
        Arc::new(ledger),
    );

    info!(
        repository = %config.repository,
        ledger = %config.ledger_path.display(),
        "Ticketing MCP server running on stdio"
    );
    tools::serve_stdio(Arc::new(TicketingHandler::new(Arc::new(service))))
        .await
        .context("Serve loop failed")?;
    Ok(())
}
