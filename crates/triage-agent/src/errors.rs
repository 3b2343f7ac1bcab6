//! Error types for the triage agent.

use thiserror::Error;
use tools::TransportError;

/// Failures talking to a language model.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{env_var} is not set")]
    MissingApiKey { env_var: &'static str },

    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse LLM response: {0}")]
    InvalidResponse(String),

    #[error("LLM returned no content")]
    EmptyResponse,
}

/// Why a model reply was not accepted as a verdict.
#[derive(Debug, Error)]
pub enum VerdictError {
    #[error("reply is not a verdict object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("ticket title is empty")]
    EmptyTitle,
}

/// Failures setting up the triage engine.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("invalid prompt template: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("invalid guardrail pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors that end or affect a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to connect to provider '{provider}': {source}")]
    Connect {
        provider: String,
        #[source]
        source: TransportError,
    },

    #[error("Provider '{provider}' does not offer tool '{tool}'")]
    MissingTool { provider: String, tool: &'static str },

    #[error("Failed to fetch incidents: {0}")]
    Fetch(#[source] TransportError),

    #[error("Incident feed rejected the request: {0}")]
    FeedRejected(String),

    #[error("Ticket sink call failed: {0}")]
    Sink(#[source] TransportError),

    #[error("Ticket sink rejected the request: {0}")]
    SinkRejected(String),

    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] handlebars::RenderError),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
