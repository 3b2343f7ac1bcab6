//! MCP tool surface of the ticketing provider.

use std::sync::Arc;

use async_trait::async_trait;
use incident_model::wire::{
    ticketing_tools, CreateTicketArgs, ErrorReply, ListRecentTicketsArgs, UpdateTicketStatusArgs,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tools::{unknown_tool, CallToolResult, Implementation, ToolDescriptor, ToolHandler};
use tracing::warn;

use crate::errors::{Result, TicketingError};
use crate::service::TicketService;

pub const SERVER_NAME: &str = "ticketing";

pub struct TicketingHandler {
    service: Arc<TicketService>,
}

impl TicketingHandler {
    pub fn new(service: Arc<TicketService>) -> Self {
        Self { service }
    }

    async fn dispatch(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        match name {
            ticketing_tools::CREATE_INCIDENT_TICKET => {
                let args: CreateTicketArgs = parse_args(arguments)?;
                let reply = self.service.create_ticket(&args).await?;
                Ok(CallToolResult::json(&reply))
            }
            ticketing_tools::UPDATE_TICKET_STATUS => {
                let args: UpdateTicketStatusArgs = parse_args(arguments)?;
                let reply = self.service.update_status(&args).await?;
                Ok(CallToolResult::json(&reply))
            }
            ticketing_tools::LIST_RECENT_TICKETS => {
                let args: ListRecentTicketsArgs = parse_args(arguments)?;
                let reply = self.service.list_recent(&args).await?;
                Ok(CallToolResult::json(&reply))
            }
            other => Ok(unknown_tool(other)),
        }
    }
}

#[async_trait]
impl ToolHandler for TicketingHandler {
    fn server_info(&self) -> Implementation {
        Implementation::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        let severities = json!(["critical", "high", "medium", "low"]);
        vec![
            ToolDescriptor {
                name: ticketing_tools::CREATE_INCIDENT_TICKET.to_string(),
                description: format!(
                    "Create an incident ticket in GitHub Issues ({}) with severity labels. \
                     Returns the existing ticket if one was already filed for the incident.",
                    self.service.repository()
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "incident_id": { "type": "string", "description": "Incident ID (e.g., INC-2026-001)" },
                        "title": { "type": "string", "description": "Short, descriptive title for the incident" },
                        "description": { "type": "string", "description": "Detailed description of the incident" },
                        "severity": { "type": "string", "enum": severities, "description": "Incident severity level" },
                        "affected_users": { "type": "integer", "description": "Number of affected users" },
                        "service": { "type": "string", "description": "Affected service name" },
                        "region": { "type": "string", "description": "Geographic region affected" }
                    },
                    "required": ["incident_id", "title", "description", "severity"]
                }),
            },
            ToolDescriptor {
                name: ticketing_tools::UPDATE_TICKET_STATUS.to_string(),
                description: "Update the status of an existing ticket".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "ticket_number": { "type": "integer", "description": "GitHub issue number" },
                        "status": {
                            "type": "string",
                            "enum": ["investigating", "resolved", "monitoring"],
                            "description": "New status for the ticket"
                        },
                        "comment": { "type": "string", "description": "Status update comment" }
                    },
                    "required": ["ticket_number", "status"]
                }),
            },
            ToolDescriptor {
                name: ticketing_tools::LIST_RECENT_TICKETS.to_string(),
                description: "List recent incident tickets from the configured repository"
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Maximum number of tickets to return",
                            "minimum": 1,
                            "maximum": 100,
                            "default": 10
                        },
                        "severity": {
                            "type": "string",
                            "enum": ["critical", "high", "medium", "low", "all"],
                            "description": "Filter by severity",
                            "default": "all"
                        }
                    }
                }),
            },
        ]
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> CallToolResult {
        match self.dispatch(name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                let label = match &e {
                    TicketingError::InvalidArguments(_) | TicketingError::Model(_) => {
                        "Invalid request"
                    }
                    _ => "Tool execution failed",
                };
                CallToolResult::error_json(&ErrorReply::new(label).with_message(e.to_string()))
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| TicketingError::InvalidArguments(e.to_string()))
}
