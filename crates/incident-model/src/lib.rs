//! Shared types for the incident triage pipeline.
//!
//! This crate provides:
//! - Incident records as produced by the incident feed provider
//! - Severity, priority and the severity → priority mapping
//! - Triage verdicts returned by the classifier
//! - Ticket records and the dedup key used by the ticketing provider
//! - Argument and reply shapes for every tool exposed by the two providers

#![warn(clippy::pedantic)]

pub mod error;
pub mod incident;
pub mod severity;
pub mod ticket;
pub mod verdict;
pub mod wire;

pub use error::ModelError;
pub use incident::Incident;
pub use severity::{Priority, Severity, SeverityFilter};
pub use ticket::{DedupKey, RepositoryName, TicketRecord, TicketStatus};
pub use verdict::TriageVerdict;
