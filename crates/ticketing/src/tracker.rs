//! Issue tracker seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Issue to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// An issue as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub html_url: String,
    pub title: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
}

/// GitHub returns labels either as plain names or as label objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IssueLabel {
    Name(String),
    Object { name: String },
}

impl IssueLabel {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Object { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub html_url: String,
}

/// Query for [`IssueTracker::list_issues`]; newest first, any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub labels: Vec<String>,
    pub per_page: u32,
}

/// Operations the ticket service needs from an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue>;

    async fn add_comment(&self, number: u64, body: &str) -> Result<Comment>;

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()>;

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>>;
}
