//! Incident triage agent.
//!
//! Pulls recent incidents from the incident feed provider, classifies each
//! one with a language model behind a quarantined prompt, and files tickets
//! through the ticketing provider. Classification failures fall back to a
//! deterministic severity-based verdict and per-incident failures never stop
//! the run.

pub mod ai;
pub mod config;
pub mod context;
pub mod errors;
pub mod guardrails;
pub mod processor;
pub mod prompt;
pub mod sources;
pub mod triage;

pub use config::AgentConfig;
pub use context::PipelineContext;
pub use errors::{AiError, PipelineError, PipelineResult, TriageError, VerdictError};
pub use processor::{IncidentOutcome, IncidentProcessor, IncidentReport, RunPolicy, RunSummary};
pub use prompt::{PromptBuilder, QuarantinedPrompt};
pub use sources::{IncidentSource, TicketSink};
pub use triage::{Triage, TriageEngine, TriageSettings, VerdictOrigin};
