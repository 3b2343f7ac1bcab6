//! Ticket sink tool provider.
//!
//! Opens GitHub issues for incidents, at most one per incident and
//! repository. The dedup ledger records every ticket this provider filed.

pub mod config;
pub mod errors;
pub mod github;
pub mod handler;
pub mod ledger;
pub mod service;
pub mod tracker;

pub use config::TicketingConfig;
pub use errors::{Result, TicketingError};
pub use github::GitHubClient;
pub use handler::TicketingHandler;
pub use ledger::{FileTicketLedger, MemoryTicketLedger, TicketLedger};
pub use service::TicketService;
pub use tracker::{Comment, Issue, IssueLabel, IssueQuery, IssueTracker, NewIssue};
