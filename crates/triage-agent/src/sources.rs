//! Seams between the processor and the two tool providers.

use async_trait::async_trait;
use incident_model::wire::{
    feed_tools, ticketing_tools, CreateTicketArgs, CreateTicketReply, GetIncidentsArgs,
    IncidentPage,
};
use incident_model::Incident;
use tools::{McpClient, ToolOutcome};

use crate::errors::{PipelineError, PipelineResult};

#[async_trait]
pub trait IncidentSource: Send + Sync {
    /// Incidents in the order the feed returns them.
    async fn fetch_incidents(&self, args: &GetIncidentsArgs) -> PipelineResult<Vec<Incident>>;
}

#[async_trait]
pub trait TicketSink: Send + Sync {
    /// Open a ticket, or return the one already recorded for this incident.
    async fn create_ticket(&self, args: &CreateTicketArgs) -> PipelineResult<CreateTicketReply>;
}

#[async_trait]
impl IncidentSource for McpClient {
    async fn fetch_incidents(&self, args: &GetIncidentsArgs) -> PipelineResult<Vec<Incident>> {
        match self
            .invoke::<_, IncidentPage>(feed_tools::GET_INCIDENTS, args)
            .await
            .map_err(PipelineError::Fetch)?
        {
            ToolOutcome::Success(page) => Ok(page.incidents),
            ToolOutcome::NotFound(failure) | ToolOutcome::Error(failure) => {
                Err(PipelineError::FeedRejected(failure.to_string()))
            }
        }
    }
}

#[async_trait]
impl TicketSink for McpClient {
    async fn create_ticket(&self, args: &CreateTicketArgs) -> PipelineResult<CreateTicketReply> {
        match self
            .invoke::<_, CreateTicketReply>(ticketing_tools::CREATE_INCIDENT_TICKET, args)
            .await
            .map_err(PipelineError::Sink)?
        {
            ToolOutcome::Success(reply) => Ok(reply),
            ToolOutcome::NotFound(failure) | ToolOutcome::Error(failure) => {
                Err(PipelineError::SinkRejected(failure.to_string()))
            }
        }
    }
}
