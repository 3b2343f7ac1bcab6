//! Triage verdicts.

use serde::{Deserialize, Serialize};

use crate::incident::Incident;
use crate::severity::Priority;

/// Reasoning recorded on verdicts produced without the classifier.
pub const HEURISTIC_REASONING: &str = "automatic triage due to classification failure";

/// Classification of one incident.
///
/// These four fields are the only thing accepted from the language model;
/// any other field in a model reply makes the reply invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TriageVerdict {
    pub should_create_ticket: bool,
    pub priority: Priority,
    pub ticket_title: String,
    pub reasoning: String,
}

impl TriageVerdict {
    /// Deterministic verdict used whenever classification fails.
    #[must_use]
    pub fn heuristic(incident: &Incident) -> Self {
        Self {
            should_create_ticket: incident.severity.creates_ticket_by_default(),
            priority: incident.severity.priority(),
            ticket_title: default_title(incident),
            reasoning: HEURISTIC_REASONING.to_string(),
        }
    }
}

/// `<service> incident`
#[must_use]
pub fn default_title(incident: &Incident) -> String {
    format!("{} incident", incident.service)
}
