//! Incident source tool provider.
//!
//! Serves a fixed set of monitoring incidents through `get_incidents`,
//! `get_incident_by_id` and `get_incident_stats`. Incident text is passed
//! through untouched; consumers treat it as untrusted.

pub mod errors;
pub mod handler;
pub mod store;

pub use errors::{FeedError, Result};
pub use handler::FeedHandler;
pub use store::IncidentStore;
