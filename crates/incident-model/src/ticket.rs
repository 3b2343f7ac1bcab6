//! Ticket records and deduplication identity.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::severity::Severity;

/// Identity under which at most one ticket may exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey {
    pub incident_id: String,
    pub repository: String,
}

impl DedupKey {
    pub fn new(incident_id: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            incident_id: incident_id.into(),
            repository: repository.into(),
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.incident_id, self.repository)
    }
}

/// A ticket opened for an incident, as kept in the dedup ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub incident_id: String,
    pub repository: String,
    pub ticket_number: u64,
    pub ticket_url: String,
    pub created_at: DateTime<Utc>,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl TicketRecord {
    #[must_use]
    pub fn key(&self) -> DedupKey {
        DedupKey::new(&self.incident_id, &self.repository)
    }
}

/// Status values accepted by `update_ticket_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Investigating,
    Resolved,
    Monitoring,
}

impl TicketStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Investigating => "investigating",
            Self::Resolved => "resolved",
            Self::Monitoring => "monitoring",
        }
    }

    /// Label attached to the ticket, e.g. `status:resolved`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("status:{}", self.as_str())
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "investigating" => Ok(Self::Investigating),
            "resolved" => Ok(Self::Resolved),
            "monitoring" => Ok(Self::Monitoring),
            _ => Err(ModelError::InvalidStatus(s.to_string())),
        }
    }
}

/// A repository in `owner/repo` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    pub owner: String,
    pub repo: String,
}

impl RepositoryName {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for RepositoryName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(ModelError::InvalidRepository(s.to_string())),
        }
    }
}
