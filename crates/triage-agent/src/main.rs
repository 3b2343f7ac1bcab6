//! Incident triage agent: one pass over the incident feed.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use incident_model::SeverityFilter;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use triage_agent::ai::{AIProvider, OpenAiCompatibleProvider};
use triage_agent::config::{
    parse_provider_command, validate_limit, validate_since_hours, DEFAULT_FEED_COMMAND,
    DEFAULT_TICKETING_COMMAND,
};
use triage_agent::triage::{DEFAULT_MAX_TOKENS, DEFAULT_PRIMARY_MODEL};
use triage_agent::{AgentConfig, PipelineContext, RunPolicy, TriageEngine, TriageSettings};

#[derive(Parser, Debug)]
#[command(name = "triage-agent")]
#[command(about = "Triage recent incidents with an LLM and file deduplicated tickets")]
#[command(version)]
struct Cli {
    /// Command line that starts the incident feed provider
    #[arg(long, env = "INCIDENT_FEED_COMMAND", default_value = DEFAULT_FEED_COMMAND)]
    feed_command: String,

    /// Command line that starts the ticketing provider
    #[arg(long, env = "TICKETING_COMMAND", default_value = DEFAULT_TICKETING_COMMAND)]
    ticketing_command: String,

    /// Only triage incidents of this severity
    #[arg(long, env = "TRIAGE_SEVERITY", value_enum, default_value_t = SeverityArg::All)]
    severity: SeverityArg,

    /// Maximum number of incidents to triage
    #[arg(long, env = "TRIAGE_LIMIT", default_value_t = 5)]
    limit: u32,

    /// Recency window in hours
    #[arg(long, env = "TRIAGE_SINCE_HOURS", default_value_t = 24)]
    since_hours: u32,

    /// Pause between incidents, in milliseconds
    #[arg(long, env = "TRIAGE_DELAY_MS", default_value_t = 1000)]
    delay_ms: u64,

    /// Per-call timeout for provider requests, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 30)]
    provider_timeout_secs: u64,

    /// Model tried first
    #[arg(long, env = "PRIMARY_MODEL", default_value = DEFAULT_PRIMARY_MODEL)]
    primary_model: String,

    /// Model tried when the primary model fails
    #[arg(long, env = "FALLBACK_MODEL")]
    fallback_model: Option<String>,

    /// Upper bound on tokens in a model reply
    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SeverityArg {
    All,
    Critical,
    High,
    Medium,
    Low,
}

impl From<SeverityArg> for SeverityFilter {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::All => Self::All,
            SeverityArg::Critical => Self::Critical,
            SeverityArg::High => Self::High,
            SeverityArg::Medium => Self::Medium,
            SeverityArg::Low => Self::Low,
        }
    }
}

impl Cli {
    fn into_config(self) -> Result<AgentConfig> {
        Ok(AgentConfig {
            feed_command: parse_provider_command(&self.feed_command)
                .context("Invalid --feed-command")?,
            ticketing_command: parse_provider_command(&self.ticketing_command)
                .context("Invalid --ticketing-command")?,
            request_timeout: Duration::from_secs(self.provider_timeout_secs),
            triage: TriageSettings {
                primary_model: self.primary_model,
                fallback_model: self.fallback_model.filter(|m| !m.trim().is_empty()),
                max_tokens: self.max_tokens,
                ..TriageSettings::default()
            },
            policy: RunPolicy {
                severity: self.severity.into(),
                limit: validate_limit(self.limit)?,
                since_hours: validate_since_hours(self.since_hours)?,
                inter_incident_delay: Duration::from_millis(self.delay_ms),
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tools::logging::init("triage_agent=info,tools=info,warn");
    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config()?;

    let provider = OpenAiCompatibleProvider::from_env().context("Failed to build LLM client")?;
    if !provider.is_configured() {
        warn!(
            "Neither GROQ_API_KEY nor OPENAI_API_KEY is set; every incident gets the heuristic verdict"
        );
    }
    info!(
        provider = provider.name(),
        endpoint = provider.endpoint(),
        model = %config.triage.primary_model,
        fallback_model = ?config.triage.fallback_model,
        "Starting triage run"
    );
    let engine = TriageEngine::new(Arc::new(provider), config.triage.clone())
        .context("Failed to initialise triage engine")?;

    let context = PipelineContext::connect(
        &config.feed_command,
        &config.ticketing_command,
        config.request_timeout,
    )
    .await
    .context("Failed to connect to tool providers")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current incident");
            on_signal.cancel();
        }
    });

    let result = context.processor(&engine, config.policy.clone()).run(&cancel).await;
    context.close().await;
    let summary = result.context("Triage run failed")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?
        );
    } else {
        print!("{summary}");
    }
    Ok(())
}
