//! In-memory incident store and the queries behind the feed tools.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use incident_model::wire::{
    GetIncidentsArgs, IncidentPage, IncidentStats, PageMetadata, ServiceCount, SeverityCounts,
};
use incident_model::Incident;
use tracing::debug;

use crate::errors::{FeedError, Result};

pub const LIMIT_RANGE: (u32, u32) = (1, 100);
pub const SINCE_HOURS_RANGE: (u32, u32) = (1, 168);

const BUILTIN_FIXTURE: &str = include_str!("../data/incidents.json");

/// Read-only incident collection, kept in feed order.
#[derive(Debug, Clone)]
pub struct IncidentStore {
    incidents: Vec<Incident>,
}

impl IncidentStore {
    pub fn new(incidents: Vec<Incident>) -> Self {
        Self { incidents }
    }

    /// The bundled demo fixture.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_FIXTURE)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let incidents: Vec<Incident> = serde_json::from_str(raw)?;
        Ok(Self::new(incidents))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| FeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Shift every timestamp so the newest incident happened at `now`.
    ///
    /// Relative spacing between incidents is preserved.
    #[must_use]
    pub fn rebased_to(mut self, now: DateTime<Utc>) -> Self {
        let Some(newest) = self.incidents.iter().map(|i| i.timestamp).max() else {
            return self;
        };
        let shift = now - newest;
        for incident in &mut self.incidents {
            incident.timestamp += shift;
        }
        debug!(shift_seconds = shift.num_seconds(), "Rebased incident timestamps");
        self
    }

    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Severity filter, then recency window, then limit.
    pub fn query(&self, args: &GetIncidentsArgs, now: DateTime<Utc>) -> Result<IncidentPage> {
        check_range("limit", args.limit, LIMIT_RANGE)?;
        check_range("since_hours", args.since_hours, SINCE_HOURS_RANGE)?;

        let cutoff = window_start(now, args.since_hours);
        let incidents: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|incident| args.severity.matches(incident.severity))
            .filter(|incident| incident.timestamp >= cutoff)
            .take(args.limit as usize)
            .cloned()
            .collect();

        Ok(IncidentPage {
            total_incidents: incidents.len(),
            incidents,
            metadata: PageMetadata {
                severity_filter: args.severity,
                time_window_hours: args.since_hours,
                timestamp: now,
            },
        })
    }

    pub fn find(&self, incident_id: &str) -> Option<&Incident> {
        self.incidents.iter().find(|incident| incident.id == incident_id)
    }

    /// Aggregate counts over incidents within the last `period_hours`.
    pub fn stats(&self, period_hours: u32, now: DateTime<Utc>) -> Result<IncidentStats> {
        if period_hours == 0 {
            return Err(FeedError::InvalidArguments(
                "period_hours must be at least 1".to_string(),
            ));
        }

        let cutoff = window_start(now, period_hours);
        let window: Vec<&Incident> = self
            .incidents
            .iter()
            .filter(|incident| incident.timestamp >= cutoff)
            .collect();

        let mut by_severity = SeverityCounts::default();
        for incident in &window {
            by_severity.record(incident.severity);
        }

        let known: Vec<u64> = window.iter().filter_map(|i| i.affected_users).collect();
        let avg_affected_users = if known.is_empty() {
            0.0
        } else {
            known.iter().sum::<u64>() as f64 / known.len() as f64
        };

        Ok(IncidentStats {
            total: window.len(),
            by_severity,
            avg_affected_users,
            most_affected_service: most_affected_service(&window),
            period_hours,
            generated_at: now,
        })
    }
}

/// Earliest timestamp inside a window of `hours` ending at `now`.
///
/// A window reaching past the earliest representable time has no lower bound.
fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Service with the most incidents; ties go to the service seen first.
fn most_affected_service(incidents: &[&Incident]) -> Option<ServiceCount> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, incident) in incidents.iter().enumerate() {
        counts
            .entry(incident.service.as_str())
            .or_insert((0, position))
            .0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (a_count, a_first)), (_, (b_count, b_first))| {
            a_count.cmp(b_count).then(b_first.cmp(a_first))
        })
        .map(|(service, (incident_count, _))| ServiceCount {
            service: service.to_string(),
            incident_count,
        })
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(FeedError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
