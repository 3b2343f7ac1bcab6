//! Severity levels, ticket priorities and the mapping between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Severity reported by the monitoring feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// All severities, most severe first.
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Baseline ticket priority for this severity.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        match self {
            Self::Critical => Priority::P0,
            Self::High => Priority::P1,
            Self::Medium => Priority::P2,
            Self::Low => Priority::P3,
        }
    }

    /// Whether the conservative heuristic opens a ticket for this severity.
    #[must_use]
    pub const fn creates_ticket_by_default(&self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }

    /// Label attached to tickets, e.g. `severity:high`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("severity:{}", self.as_str())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ModelError::InvalidSeverity(s.to_string())),
        }
    }
}

/// Ticket priority, P0 being the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl Priority {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
        }
    }

    /// Numeric rank, 0 for P0.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::P0 => 0,
            Self::P1 => 1,
            Self::P2 => 2,
            Self::P3 => 3,
        }
    }

    #[must_use]
    pub const fn from_rank(rank: u8) -> Self {
        match rank {
            0 => Self::P0,
            1 => Self::P1,
            2 => Self::P2,
            _ => Self::P3,
        }
    }

    /// Label attached to tickets, e.g. `priority:P1`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("priority:{}", self.as_str())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "P0" => Ok(Self::P0),
            "P1" => Ok(Self::P1),
            "P2" => Ok(Self::P2),
            "P3" => Ok(Self::P3),
            _ => Err(ModelError::InvalidPriority(s.to_string())),
        }
    }
}

/// Severity filter accepted by the listing tools (`all` disables filtering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityFilter {
    #[default]
    All,
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityFilter {
    /// The single severity selected, or `None` for `all`.
    #[must_use]
    pub const fn severity(&self) -> Option<Severity> {
        match self {
            Self::All => None,
            Self::Critical => Some(Severity::Critical),
            Self::High => Some(Severity::High),
            Self::Medium => Some(Severity::Medium),
            Self::Low => Some(Severity::Low),
        }
    }

    #[must_use]
    pub fn matches(&self, severity: Severity) -> bool {
        self.severity().is_none_or(|s| s == severity)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl From<Severity> for SeverityFilter {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Self::Critical,
            Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low => Self::Low,
        }
    }
}

impl fmt::Display for SeverityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityFilter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<Severity>().map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_mapping_table() {
        let table = [
            (Severity::Critical, Priority::P0, true),
            (Severity::High, Priority::P1, true),
            (Severity::Medium, Priority::P2, false),
            (Severity::Low, Priority::P3, false),
        ];

        for (severity, priority, creates) in table {
            assert_eq!(severity.priority(), priority, "priority for {severity}");
            assert_eq!(
                severity.creates_ticket_by_default(),
                creates,
                "default decision for {severity}"
            );
        }
    }

    #[test]
    fn test_severity_parse_is_case_insensitive() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("Low".parse::<Severity>().unwrap(), Severity::Low);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        assert!(SeverityFilter::All.matches(Severity::Low));
        assert!(SeverityFilter::Critical.matches(Severity::Critical));
        assert!(!SeverityFilter::Critical.matches(Severity::High));
        assert_eq!("all".parse::<SeverityFilter>().unwrap(), SeverityFilter::All);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Severity::High.label(), "severity:high");
        assert_eq!(Priority::P1.label(), "priority:P1");
    }

    #[test]
    fn test_priority_rank_round_trip_saturates() {
        assert_eq!(Priority::from_rank(Priority::P2.rank()), Priority::P2);
        assert_eq!(Priority::from_rank(9), Priority::P3);
    }
}
