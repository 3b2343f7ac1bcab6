//! One sequential pass over the incident feed.
//!
//! Each incident is triaged and, when the verdict asks for it, sent to the
//! ticket sink. A failure while handling one incident is recorded in the run
//! summary and the loop moves on to the next one.

use std::fmt;
use std::time::Duration;

use incident_model::wire::{CreateTicketArgs, GetIncidentsArgs};
use incident_model::{Incident, Priority, Severity, SeverityFilter};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::PipelineResult;
use crate::sources::{IncidentSource, TicketSink};
use crate::triage::{TriageEngine, VerdictOrigin};

pub const DEFAULT_RUN_LIMIT: u32 = 5;
pub const DEFAULT_SINCE_HOURS: u32 = 24;
pub const DEFAULT_INTER_INCIDENT_DELAY: Duration = Duration::from_secs(1);

/// What to fetch and how fast to work through it.
#[derive(Debug, Clone)]
pub struct RunPolicy {
    pub severity: SeverityFilter,
    pub limit: u32,
    pub since_hours: u32,
    pub inter_incident_delay: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            severity: SeverityFilter::All,
            limit: DEFAULT_RUN_LIMIT,
            since_hours: DEFAULT_SINCE_HOURS,
            inter_incident_delay: DEFAULT_INTER_INCIDENT_DELAY,
        }
    }
}

impl RunPolicy {
    fn fetch_args(&self) -> GetIncidentsArgs {
        GetIncidentsArgs {
            severity: self.severity,
            limit: self.limit,
            since_hours: self.since_hours,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IncidentOutcome {
    Created {
        number: u64,
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    Duplicate {
        number: u64,
        url: String,
    },
    Skipped,
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentReport {
    pub incident_id: String,
    pub severity: Severity,
    pub priority: Priority,
    pub origin: VerdictOrigin,
    #[serde(flatten)]
    pub outcome: IncidentOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub created: usize,
    pub duplicate: usize,
    pub skipped: usize,
    pub failed: usize,
    pub model_used: String,
    /// Verdicts that came from the heuristic rather than a model.
    pub fallback_verdicts: usize,
    pub cancelled: bool,
    pub incidents: Vec<IncidentReport>,
}

impl RunSummary {
    fn new(model_used: &str) -> Self {
        Self {
            model_used: model_used.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, report: IncidentReport) {
        self.processed += 1;
        match report.outcome {
            IncidentOutcome::Created { .. } => self.created += 1,
            IncidentOutcome::Duplicate { .. } => self.duplicate += 1,
            IncidentOutcome::Skipped => self.skipped += 1,
            IncidentOutcome::Failed { .. } => self.failed += 1,
        }
        if report.origin.is_heuristic() {
            self.fallback_verdicts += 1;
        }
        self.incidents.push(report);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Triage run summary")?;
        writeln!(f, "  processed:        {}", self.processed)?;
        writeln!(f, "  tickets created:  {}", self.created)?;
        writeln!(f, "  duplicates:       {}", self.duplicate)?;
        writeln!(f, "  skipped:          {}", self.skipped)?;
        writeln!(f, "  failed:           {}", self.failed)?;
        writeln!(f, "  model:            {}", self.model_used)?;
        writeln!(f, "  heuristic verdicts: {}", self.fallback_verdicts)?;
        if self.cancelled {
            writeln!(f, "  run was cancelled before all incidents were processed")?;
        }
        for report in &self.incidents {
            let detail = match &report.outcome {
                IncidentOutcome::Created {
                    number,
                    url,
                    warning: None,
                } => format!("created #{number} {url}"),
                IncidentOutcome::Created {
                    number,
                    url,
                    warning: Some(w),
                } => format!("created #{number} {url} (warning: {w})"),
                IncidentOutcome::Duplicate { number, url } => {
                    format!("duplicate of #{number} {url}")
                }
                IncidentOutcome::Skipped => "no ticket needed".to_string(),
                IncidentOutcome::Failed { reason } => format!("failed: {reason}"),
            };
            writeln!(
                f,
                "  - {} [{} {}] via {}: {detail}",
                report.incident_id, report.severity, report.priority, report.origin
            )?;
        }
        Ok(())
    }
}

pub struct IncidentProcessor<'a> {
    source: &'a dyn IncidentSource,
    sink: &'a dyn TicketSink,
    engine: &'a TriageEngine,
    policy: RunPolicy,
}

impl<'a> IncidentProcessor<'a> {
    pub fn new(
        source: &'a dyn IncidentSource,
        sink: &'a dyn TicketSink,
        engine: &'a TriageEngine,
        policy: RunPolicy,
    ) -> Self {
        Self {
            source,
            sink,
            engine,
            policy,
        }
    }

    /// Fetch once and handle every incident in feed order.
    ///
    /// Only a failed fetch is returned as an error. Cancellation is honoured
    /// before each incident and during the delay between incidents.
    pub async fn run(&self, cancel: &CancellationToken) -> PipelineResult<RunSummary> {
        let mut summary = RunSummary::new(&self.engine.settings().primary_model);
        let fetch_args = self.policy.fetch_args();

        let incidents = tokio::select! {
            () = cancel.cancelled() => {
                summary.cancelled = true;
                return Ok(summary);
            }
            fetched = self.source.fetch_incidents(&fetch_args) => fetched?,
        };
        info!(
            count = incidents.len(),
            severity = self.policy.severity.as_str(),
            "Fetched incidents"
        );

        for (index, incident) in incidents.iter().enumerate() {
            if index > 0 && !self.pause(cancel).await {
                summary.cancelled = true;
                break;
            }
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            summary.record(self.process(incident).await);
        }

        if summary.cancelled {
            warn!(processed = summary.processed, total = incidents.len(), "Run cancelled");
        }
        info!(
            processed = summary.processed,
            created = summary.created,
            duplicate = summary.duplicate,
            skipped = summary.skipped,
            failed = summary.failed,
            "Run complete"
        );
        Ok(summary)
    }

    /// Wait out the inter-incident delay. Returns false if cancelled.
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        if self.policy.inter_incident_delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(self.policy.inter_incident_delay) => true,
        }
    }

    async fn process(&self, incident: &Incident) -> IncidentReport {
        info!(
            incident_id = %incident.id,
            severity = %incident.severity,
            service = %incident.service,
            description = %incident.description_preview(100),
            "Processing incident"
        );

        let triage = self.engine.triage(incident).await;
        let verdict = &triage.verdict;

        let outcome = if verdict.should_create_ticket {
            self.file_ticket(incident, &verdict.ticket_title).await
        } else {
            info!(incident_id = %incident.id, reasoning = %verdict.reasoning, "No ticket needed");
            IncidentOutcome::Skipped
        };

        IncidentReport {
            incident_id: incident.id.clone(),
            severity: incident.severity,
            priority: verdict.priority,
            origin: triage.origin,
            outcome,
        }
    }

    async fn file_ticket(&self, incident: &Incident, title: &str) -> IncidentOutcome {
        let args = CreateTicketArgs {
            incident_id: incident.id.clone(),
            title: title.to_string(),
            description: incident.description.clone(),
            severity: incident.severity,
            affected_users: incident.affected_users,
            service: Some(incident.service.clone()),
            region: incident.region.clone(),
        };

        match self.sink.create_ticket(&args).await {
            Ok(reply) if reply.duplicate => {
                info!(
                    incident_id = %incident.id,
                    ticket_number = reply.ticket_number,
                    "Ticket already exists"
                );
                IncidentOutcome::Duplicate {
                    number: reply.ticket_number,
                    url: reply.ticket_url,
                }
            }
            Ok(reply) => {
                if let Some(warning) = &reply.warning {
                    error!(
                        data_integrity = true,
                        incident_id = %incident.id,
                        ticket_number = reply.ticket_number,
                        warning = %warning,
                        "Ticket created without a dedup record"
                    );
                }
                info!(incident_id = %incident.id, ticket_url = %reply.ticket_url, "Ticket created");
                IncidentOutcome::Created {
                    number: reply.ticket_number,
                    url: reply.ticket_url,
                    warning: reply.warning,
                }
            }
            Err(e) => {
                error!(incident_id = %incident.id, error = %e, "Failed to create ticket");
                IncidentOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}
