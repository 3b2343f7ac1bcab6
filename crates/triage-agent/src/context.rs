//! Connections to both tool providers for the lifetime of one run.

use std::time::Duration;

use incident_model::wire::{feed_tools, ticketing_tools};
use tools::{Implementation, McpClient, ProviderCommand, Transport, TransportError};
use tracing::{info, warn};

use crate::errors::{PipelineError, PipelineResult};
use crate::processor::{IncidentProcessor, RunPolicy};
use crate::triage::TriageEngine;

pub const FEED_PROVIDER: &str = "incident-feed";
pub const TICKETING_PROVIDER: &str = "ticketing";

const CLIENT_NAME: &str = "triage-agent";

pub struct PipelineContext {
    feed: McpClient,
    ticketing: McpClient,
}

impl PipelineContext {
    /// Launch both providers and complete their handshakes.
    ///
    /// Either provider failing to start, handshake, or advertise the tool the
    /// run depends on fails the whole connection step.
    pub async fn connect(
        feed: &ProviderCommand,
        ticketing: &ProviderCommand,
        request_timeout: Duration,
    ) -> PipelineResult<Self> {
        let feed = connect_provider(FEED_PROVIDER, feed, request_timeout).await?;
        let ticketing =
            match connect_provider(TICKETING_PROVIDER, ticketing, request_timeout).await {
                Ok(client) => client,
                Err(e) => {
                    close_quietly(&feed).await;
                    return Err(e);
                }
            };

        let context = Self { feed, ticketing };
        if let Err(e) = context.verify_tools().await {
            context.close().await;
            return Err(e);
        }
        Ok(context)
    }

    /// Wrap clients that are already connected.
    pub fn from_clients(feed: McpClient, ticketing: McpClient) -> Self {
        Self { feed, ticketing }
    }

    pub fn feed(&self) -> &McpClient {
        &self.feed
    }

    pub fn ticketing(&self) -> &McpClient {
        &self.ticketing
    }

    pub fn processor<'a>(
        &'a self,
        engine: &'a TriageEngine,
        policy: RunPolicy,
    ) -> IncidentProcessor<'a> {
        IncidentProcessor::new(&self.feed, &self.ticketing, engine, policy)
    }

    /// Check that each provider offers the tool the run calls.
    pub async fn verify_tools(&self) -> PipelineResult<()> {
        require_tool(&self.feed, feed_tools::GET_INCIDENTS).await?;
        require_tool(&self.ticketing, ticketing_tools::CREATE_INCIDENT_TICKET).await
    }

    /// Close both connections; failures are logged, not returned.
    pub async fn close(self) {
        close_quietly(&self.feed).await;
        close_quietly(&self.ticketing).await;
    }
}

async fn connect_provider(
    name: &str,
    command: &ProviderCommand,
    request_timeout: Duration,
) -> PipelineResult<McpClient> {
    let connect_error = |source: TransportError| PipelineError::Connect {
        provider: name.to_string(),
        source,
    };

    let transport = Transport::spawn(name, command)
        .map_err(connect_error)?
        .with_request_timeout(request_timeout);
    let client = McpClient::connect(
        transport,
        Implementation::new(CLIENT_NAME, env!("CARGO_PKG_VERSION")),
    )
    .await
    .map_err(connect_error)?;

    info!(
        provider = name,
        server = %client.server_info().name,
        version = %client.server_info().version,
        "Connected to tool provider"
    );
    Ok(client)
}

async fn require_tool(client: &McpClient, tool: &'static str) -> PipelineResult<()> {
    let tools = client.list_tools().await.map_err(|source| PipelineError::Connect {
        provider: client.provider().to_string(),
        source,
    })?;
    if tools.iter().any(|t| t.name == tool) {
        Ok(())
    } else {
        Err(PipelineError::MissingTool {
            provider: client.provider().to_string(),
            tool,
        })
    }
}

async fn close_quietly(client: &McpClient) {
    if let Err(e) = client.close().await {
        warn!(provider = client.provider(), error = %e, "Failed to close provider connection");
    }
}
