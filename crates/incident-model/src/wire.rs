//! Argument and reply shapes of the provider tools.
//!
//! Both providers and the agent serialize through these types, so a field
//! renamed here is renamed on both ends of the channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::incident::Incident;
use crate::severity::{Severity, SeverityFilter};
use crate::ticket::TicketStatus;

/// Tool names exposed by the incident feed provider.
pub mod feed_tools {
    pub const GET_INCIDENTS: &str = "get_incidents";
    pub const GET_INCIDENT_BY_ID: &str = "get_incident_by_id";
    pub const GET_INCIDENT_STATS: &str = "get_incident_stats";
}

/// Tool names exposed by the ticketing provider.
pub mod ticketing_tools {
    pub const CREATE_INCIDENT_TICKET: &str = "create_incident_ticket";
    pub const UPDATE_TICKET_STATUS: &str = "update_ticket_status";
    pub const LIST_RECENT_TICKETS: &str = "list_recent_tickets";
}

/// Error text used by providers for unknown records.
pub const NOT_FOUND_ERROR: &str = "Incident not found";

fn default_limit() -> u32 {
    10
}

fn default_hours() -> u32 {
    24
}

/// Arguments of `get_incidents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIncidentsArgs {
    #[serde(default)]
    pub severity: SeverityFilter,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_hours")]
    pub since_hours: u32,
}

impl Default for GetIncidentsArgs {
    fn default() -> Self {
        Self {
            severity: SeverityFilter::All,
            limit: default_limit(),
            since_hours: default_hours(),
        }
    }
}

/// Reply of `get_incidents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentPage {
    pub total_incidents: usize,
    pub incidents: Vec<Incident>,
    pub metadata: PageMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub severity_filter: SeverityFilter,
    pub time_window_hours: u32,
    pub timestamp: DateTime<Utc>,
}

/// Arguments of `get_incident_by_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIncidentByIdArgs {
    pub incident_id: String,
}

/// Arguments of `get_incident_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIncidentStatsArgs {
    #[serde(default = "default_hours")]
    pub period_hours: u32,
}

impl Default for GetIncidentStatsArgs {
    fn default() -> Self {
        Self {
            period_hours: default_hours(),
        }
    }
}

/// Reply of `get_incident_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentStats {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub avg_affected_users: f64,
    pub most_affected_service: Option<ServiceCount>,
    pub period_hours: u32,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCount {
    pub service: String,
    pub incident_count: usize,
}

/// Arguments of `create_incident_ticket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTicketArgs {
    pub incident_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_users: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Reply of `create_incident_ticket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTicketReply {
    pub success: bool,
    pub duplicate: bool,
    pub ticket_url: String,
    pub ticket_number: u64,
    pub incident_id: String,
    pub severity: Severity,
    pub repository: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set when the ticket exists but its dedup record could not be stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Arguments of `update_ticket_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTicketStatusArgs {
    pub ticket_number: u64,
    pub status: TicketStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Reply of `update_ticket_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTicketStatusReply {
    pub success: bool,
    pub ticket_number: u64,
    pub status: TicketStatus,
    pub repository: String,
    pub comment_url: String,
}

/// Arguments of `list_recent_tickets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecentTicketsArgs {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub severity: SeverityFilter,
}

impl Default for ListRecentTicketsArgs {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            severity: SeverityFilter::All,
        }
    }
}

/// Reply of `list_recent_tickets`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketList {
    pub repository: String,
    pub total: usize,
    pub tickets: Vec<TicketSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<String>,
}

/// In-band error payload returned with `isError: true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
}

impl ErrorReply {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            incident_id: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn not_found(incident_id: impl Into<String>) -> Self {
        Self {
            error: NOT_FOUND_ERROR.to_string(),
            message: None,
            incident_id: Some(incident_id.into()),
        }
    }

    /// Whether this reply reports a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.error.to_ascii_lowercase().contains("not found")
    }
}
