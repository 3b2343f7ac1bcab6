//! Scripted model, feed and sink doubles shared by the pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use incident_model::wire::{CreateTicketArgs, CreateTicketReply, GetIncidentsArgs};
use incident_model::{Incident, Severity};
use tokio_util::sync::CancellationToken;
use triage_agent::ai::{AIMessage, AIProvider, AIResponse, GenerateOptions, TokenUsage};
use triage_agent::{AiError, IncidentSource, PipelineError, PipelineResult, TicketSink};

pub fn incident(
    id: &str,
    severity: Severity,
    affected_users: Option<u64>,
    description: &str,
) -> Incident {
    Incident {
        id: id.to_string(),
        timestamp: Utc::now() - Duration::minutes(5),
        severity,
        service: "payment-processor".to_string(),
        description: description.to_string(),
        affected_users,
        region: Some("us-west-2".to_string()),
        error_rate: None,
        metrics: serde_json::Map::new(),
    }
}

/// Replies per model name; a model with no script fails.
#[derive(Default)]
pub struct ScriptedModel {
    replies: HashMap<String, String>,
    pub calls: Mutex<Vec<(String, Vec<AIMessage>)>>,
}

impl ScriptedModel {
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn reply(mut self, model: &str, text: &str) -> Self {
        self.replies.insert(model.to_string(), text.to_string());
        self
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl AIProvider for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn generate_text(
        &self,
        model: &str,
        messages: &[AIMessage],
        _options: &GenerateOptions,
    ) -> Result<AIResponse, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
        match self.replies.get(model) {
            Some(text) => Ok(AIResponse {
                text: text.clone(),
                usage: TokenUsage::default(),
                model: model.to_string(),
                provider: "scripted".to_string(),
            }),
            None => Err(AiError::Api {
                status: 503,
                message: "model unavailable".to_string(),
            }),
        }
    }
}

pub struct FixedSource {
    pub incidents: Vec<Incident>,
    pub fail: bool,
}

impl FixedSource {
    pub fn new(incidents: Vec<Incident>) -> Self {
        Self { incidents, fail: false }
    }
}

#[async_trait]
impl IncidentSource for FixedSource {
    async fn fetch_incidents(&self, args: &GetIncidentsArgs) -> PipelineResult<Vec<Incident>> {
        if self.fail {
            return Err(PipelineError::FeedRejected("feed offline".to_string()));
        }
        Ok(self
            .incidents
            .iter()
            .filter(|i| args.severity.matches(i.severity))
            .take(args.limit as usize)
            .cloned()
            .collect())
    }
}

/// Records every create call; never reports duplicates.
#[derive(Default)]
pub struct RecordingSink {
    pub created: Mutex<Vec<CreateTicketArgs>>,
    pub fail_for: Option<String>,
    /// Cancelled after the first successful create.
    pub cancel_after_first: Option<CancellationToken>,
}

#[async_trait]
impl TicketSink for RecordingSink {
    async fn create_ticket(&self, args: &CreateTicketArgs) -> PipelineResult<CreateTicketReply> {
        if self.fail_for.as_deref() == Some(args.incident_id.as_str()) {
            return Err(PipelineError::SinkRejected("Tool execution failed: 502".to_string()));
        }
        let number = {
            let mut created = self.created.lock().unwrap();
            created.push(args.clone());
            created.len() as u64
        };
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
        Ok(CreateTicketReply {
            success: true,
            duplicate: false,
            ticket_url: format!("https://github.com/acme/ops/issues/{number}"),
            ticket_number: number,
            incident_id: args.incident_id.clone(),
            severity: args.severity,
            repository: "acme/ops".to_string(),
            created_at: Utc::now(),
            message: None,
            warning: None,
        })
    }
}
