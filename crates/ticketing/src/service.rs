//! Deduplicated ticket creation and ticket maintenance.
//!
//! `create_ticket` holds a per-key lock from the ledger lookup until the new
//! record is stored, so two concurrent requests for the same incident and
//! repository open at most one issue between them.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, Utc};
use incident_model::wire::{
    CreateTicketArgs, CreateTicketReply, ListRecentTicketsArgs, TicketList, TicketSummary,
    UpdateTicketStatusArgs, UpdateTicketStatusReply,
};
use incident_model::{DedupKey, RepositoryName, Severity, TicketRecord};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::errors::{Result, TicketingError};
use crate::ledger::TicketLedger;
use crate::tracker::{IssueQuery, IssueTracker, NewIssue};

pub const PROVENANCE_FOOTER: &str = "*Auto-created by the incident triage agent*";

const DUPLICATE_MESSAGE: &str = "Ticket already exists for this incident";
const MAX_LIST_LIMIT: u32 = 100;

type KeyLocks = StdMutex<HashMap<DedupKey, Arc<Mutex<()>>>>;

pub struct TicketService {
    repository: RepositoryName,
    tracker: Arc<dyn IssueTracker>,
    ledger: Arc<dyn TicketLedger>,
    key_locks: KeyLocks,
}

impl TicketService {
    pub fn new(
        repository: RepositoryName,
        tracker: Arc<dyn IssueTracker>,
        ledger: Arc<dyn TicketLedger>,
    ) -> Self {
        Self {
            repository,
            tracker,
            ledger,
            key_locks: StdMutex::default(),
        }
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Open an issue for the incident unless this repository already has one.
    pub async fn create_ticket(&self, args: &CreateTicketArgs) -> Result<CreateTicketReply> {
        if args.incident_id.trim().is_empty() {
            return Err(TicketingError::InvalidArguments(
                "incident_id must not be empty".to_string(),
            ));
        }
        if args.title.trim().is_empty() {
            return Err(TicketingError::InvalidArguments(
                "title must not be empty".to_string(),
            ));
        }

        let repository = self.repository.full_name();
        let key = DedupKey::new(&args.incident_id, &repository);
        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.create_locked(&key, args).await
        };
        drop(lock);
        self.release_key_lock(&key);
        result
    }

    async fn create_locked(
        &self,
        key: &DedupKey,
        args: &CreateTicketArgs,
    ) -> Result<CreateTicketReply> {
        if let Some(existing) = self.ledger.find(key).await? {
            info!(
                incident_id = %args.incident_id,
                ticket_number = existing.ticket_number,
                "Ticket already exists, not creating another"
            );
            return Ok(CreateTicketReply {
                success: true,
                duplicate: true,
                ticket_url: existing.ticket_url,
                ticket_number: existing.ticket_number,
                incident_id: args.incident_id.clone(),
                severity: args.severity,
                repository: key.repository.clone(),
                created_at: existing.created_at,
                message: Some(DUPLICATE_MESSAGE.to_string()),
                warning: None,
            });
        }

        let issue = NewIssue {
            title: ticket_title(args.severity, &args.title),
            body: ticket_body(args, Utc::now()),
            labels: ticket_labels(args.severity),
        };
        let created = self.tracker.create_issue(&issue).await?;

        let record = TicketRecord {
            incident_id: args.incident_id.clone(),
            repository: key.repository.clone(),
            ticket_number: created.number,
            ticket_url: created.html_url.clone(),
            created_at: created.created_at,
            severity: args.severity,
            service: args.service.clone(),
        };

        let warning = match self.ledger.insert_if_absent(record).await {
            Ok(true) => None,
            Ok(false) => {
                // Only reachable if something bypassed the key lock.
                warn!(
                    dedup_key = %key,
                    "Ledger already held a record for a freshly created ticket"
                );
                None
            }
            Err(e) => {
                error!(
                    data_integrity = true,
                    dedup_key = %key,
                    ticket_number = created.number,
                    ticket_url = %created.html_url,
                    error = %e,
                    "Ticket created but its dedup record was not persisted; a retry may open a duplicate"
                );
                Some(format!(
                    "Ticket #{} was created but could not be recorded for deduplication: {e}",
                    created.number
                ))
            }
        };

        info!(
            incident_id = %args.incident_id,
            ticket_number = created.number,
            repository = %key.repository,
            "Created ticket"
        );

        Ok(CreateTicketReply {
            success: true,
            duplicate: false,
            ticket_url: created.html_url,
            ticket_number: created.number,
            incident_id: args.incident_id.clone(),
            severity: args.severity,
            repository: key.repository.clone(),
            created_at: created.created_at,
            message: None,
            warning,
        })
    }

    /// Comment on a ticket and tag it with its new status.
    pub async fn update_status(
        &self,
        args: &UpdateTicketStatusArgs,
    ) -> Result<UpdateTicketStatusReply> {
        let body = match args.comment.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(comment) => format!("**Status Update: {}**\n\n{comment}", args.status),
            None => format!("**Status Update: {}**", args.status),
        };

        let comment = self.tracker.add_comment(args.ticket_number, &body).await?;
        self.tracker
            .add_labels(args.ticket_number, &[args.status.label()])
            .await?;

        info!(ticket_number = args.ticket_number, status = %args.status, "Updated ticket status");
        Ok(UpdateTicketStatusReply {
            success: true,
            ticket_number: args.ticket_number,
            status: args.status,
            repository: self.repository.full_name(),
            comment_url: comment.html_url,
        })
    }

    /// Newest incident tickets, optionally restricted to one severity.
    pub async fn list_recent(&self, args: &ListRecentTicketsArgs) -> Result<TicketList> {
        let mut labels = vec!["incident".to_string()];
        if let Some(severity) = args.severity.severity() {
            labels.push(severity.label());
        }
        let query = IssueQuery {
            labels,
            per_page: args.limit.clamp(1, MAX_LIST_LIMIT),
        };

        let tickets: Vec<TicketSummary> = self
            .tracker
            .list_issues(&query)
            .await?
            .into_iter()
            .map(|issue| TicketSummary {
                number: issue.number,
                title: issue.title,
                state: issue.state,
                url: issue.html_url,
                created_at: issue.created_at,
                labels: issue.labels.iter().map(|l| l.name().to_string()).collect(),
            })
            .collect();

        Ok(TicketList {
            repository: self.repository.full_name(),
            total: tickets.len(),
            tickets,
        })
    }

    fn key_lock(&self, key: &DedupKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// Drop the lock entry once nobody else is waiting on it.
    fn release_key_lock(&self, key: &DedupKey) {
        let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }
}

/// `[SEVERITY] title`
pub fn ticket_title(severity: Severity, title: &str) -> String {
    format!("[{}] {}", severity.as_str().to_ascii_uppercase(), title.trim())
}

pub fn ticket_labels(severity: Severity) -> Vec<String> {
    vec![
        "incident".to_string(),
        severity.label(),
        "automated".to_string(),
        severity.priority().label(),
    ]
}

pub fn ticket_body(args: &CreateTicketArgs, detected_at: DateTime<Utc>) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "## Incident: {}", args.incident_id);
    let _ = writeln!(body);
    let _ = writeln!(body, "**Severity:** {}", args.severity.as_str().to_ascii_uppercase());
    let _ = writeln!(body);
    let _ = writeln!(body, "### Description");
    let _ = writeln!(body, "{}", args.description);
    let _ = writeln!(body);
    let _ = writeln!(body, "### Impact");
    if let Some(users) = args.affected_users {
        let _ = writeln!(body, "- **Affected Users:** {}", group_thousands(users));
    }
    if let Some(service) = &args.service {
        let _ = writeln!(body, "- **Service:** {service}");
    }
    if let Some(region) = &args.region {
        let _ = writeln!(body, "- **Region:** {region}");
    }
    let _ = writeln!(body);
    let _ = writeln!(body, "### Timeline");
    let _ = writeln!(body, "- **Detected:** {}", detected_at.to_rfc3339());
    let _ = writeln!(body, "- **Status:** Investigating");
    let _ = writeln!(body);
    let _ = writeln!(body, "---");
    let _ = writeln!(body, "{PROVENANCE_FOOTER}");
    body
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(severity: Severity) -> CreateTicketArgs {
        CreateTicketArgs {
            incident_id: "INC-2026-001".to_string(),
            title: "Checkout errors".to_string(),
            description: "Database connection pool exhausted".to_string(),
            severity,
            affected_users: Some(12000),
            service: Some("api-gateway".to_string()),
            region: None,
        }
    }

    #[test]
    fn test_labels_for_high() {
        assert_eq!(
            ticket_labels(Severity::High),
            vec!["incident", "severity:high", "automated", "priority:P1"]
        );
        assert!(ticket_labels(Severity::Low).contains(&"priority:P3".to_string()));
    }

    #[test]
    fn test_title_prefix() {
        assert_eq!(
            ticket_title(Severity::Critical, " Checkout errors "),
            "[CRITICAL] Checkout errors"
        );
    }

    #[test]
    fn test_body_sections() {
        let detected = Utc.with_ymd_and_hms(2026, 2, 12, 10, 23, 0).unwrap();
        let body = ticket_body(&args(Severity::Critical), detected);

        assert!(body.starts_with("## Incident: INC-2026-001\n"));
        assert!(body.contains("**Severity:** CRITICAL"));
        assert!(body.contains("- **Affected Users:** 12,000"));
        assert!(body.contains("- **Service:** api-gateway"));
        assert!(!body.contains("Region"));
        assert!(body.contains("- **Detected:** 2026-02-12T10:23:00+00:00"));
        assert!(body.trim_end().ends_with(PROVENANCE_FOOTER));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }
}
