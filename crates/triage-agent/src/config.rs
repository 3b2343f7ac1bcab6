//! Settings for a triage run, assembled from command-line flags.

use std::time::Duration;

use tools::{ProviderCommand, DEFAULT_REQUEST_TIMEOUT};

use crate::errors::{PipelineError, PipelineResult};
use crate::processor::RunPolicy;
use crate::triage::TriageSettings;

pub const DEFAULT_FEED_COMMAND: &str = "incident-feed";
pub const DEFAULT_TICKETING_COMMAND: &str = "ticketing";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub feed_command: ProviderCommand,
    pub ticketing_command: ProviderCommand,
    pub request_timeout: Duration,
    pub triage: TriageSettings,
    pub policy: RunPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            feed_command: ProviderCommand::new(DEFAULT_FEED_COMMAND),
            ticketing_command: ProviderCommand::new(DEFAULT_TICKETING_COMMAND),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            triage: TriageSettings::default(),
            policy: RunPolicy::default(),
        }
    }
}

/// Split a whitespace-separated command line into program and arguments.
///
/// Quoting is not interpreted.
pub fn parse_provider_command(command_line: &str) -> PipelineResult<ProviderCommand> {
    let mut parts = command_line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| PipelineError::Config("provider command is empty".to_string()))?;
    Ok(ProviderCommand::new(program).args(parts))
}

/// Accept `1..=100` incidents per run.
pub fn validate_limit(limit: u32) -> PipelineResult<u32> {
    if (1..=100).contains(&limit) {
        Ok(limit)
    } else {
        Err(PipelineError::Config(format!("limit must be between 1 and 100, got {limit}")))
    }
}

/// Accept a `1..=168` hour recency window.
pub fn validate_since_hours(hours: u32) -> PipelineResult<u32> {
    if (1..=168).contains(&hours) {
        Ok(hours)
    } else {
        Err(PipelineError::Config(format!(
            "since-hours must be between 1 and 168, got {hours}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_provider_command() {
        let command = parse_provider_command("  cargo run -q -p incident-feed --  ").unwrap();
        assert_eq!(command.program, PathBuf::from("cargo"));
        assert_eq!(command.args, vec!["run", "-q", "-p", "incident-feed", "--"]);

        assert!(parse_provider_command("   ").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.policy.limit, 5);
        assert_eq!(config.policy.since_hours, 24);
        assert_eq!(config.policy.inter_incident_delay, Duration::from_secs(1));
        assert_eq!(config.triage.primary_model, "llama-3.3-70b-versatile");
        assert!((config.triage.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.feed_command.program, PathBuf::from("incident-feed"));
    }

    #[test]
    fn test_bounds() {
        assert!(validate_limit(0).is_err());
        assert_eq!(validate_limit(100).unwrap(), 100);
        assert!(validate_since_hours(169).is_err());
        assert_eq!(validate_since_hours(1).unwrap(), 1);
    }
}
