//! Incident records produced by the monitoring feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::severity::Severity;

/// An alert from the monitoring feed.
///
/// `description` and other free-text fields come from an untrusted source and
/// must never be interpreted as instructions by anything downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub service: String,
    pub description: String,
    #[serde(default, alias = "affectedUsers", skip_serializing_if = "Option::is_none")]
    pub affected_users: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    /// Opaque provider-specific measurements.
    #[serde(default)]
    pub metrics: Map<String, Value>,
}

impl Incident {
    /// First `max_chars` characters of the description, for log lines.
    #[must_use]
    pub fn description_preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.description.chars().take(max_chars).collect();
        if self.description.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}
