//! Incident classification with a model chain and a deterministic fallback.

use std::fmt;
use std::sync::Arc;

use incident_model::{Incident, TriageVerdict};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{strip_code_fences, AIProvider, GenerateOptions};
use crate::errors::{TriageError, VerdictError};
use crate::guardrails::Guardrails;
use crate::prompt::PromptBuilder;

pub const DEFAULT_PRIMARY_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 512;

#[derive(Debug, Clone)]
pub struct TriageSettings {
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for TriageSettings {
    fn default() -> Self {
        Self {
            primary_model: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback_model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Where a verdict came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "model", rename_all = "lowercase")]
pub enum VerdictOrigin {
    Model(String),
    Heuristic,
}

impl VerdictOrigin {
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Self::Heuristic)
    }
}

impl fmt::Display for VerdictOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(model) => f.write_str(model),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triage {
    pub verdict: TriageVerdict,
    pub origin: VerdictOrigin,
}

pub struct TriageEngine {
    provider: Arc<dyn AIProvider>,
    prompts: PromptBuilder,
    guardrails: Guardrails,
    settings: TriageSettings,
}

impl TriageEngine {
    pub fn new(
        provider: Arc<dyn AIProvider>,
        settings: TriageSettings,
    ) -> Result<Self, TriageError> {
        Ok(Self {
            provider,
            prompts: PromptBuilder::new()?,
            guardrails: Guardrails::new()?,
            settings,
        })
    }

    pub fn settings(&self) -> &TriageSettings {
        &self.settings
    }

    /// Classify one incident. Never fails: when no model produces a usable
    /// verdict the heuristic verdict is returned.
    pub async fn triage(&self, incident: &Incident) -> Triage {
        if !self.provider.is_configured() {
            debug!(
                incident_id = %incident.id,
                provider = self.provider.name(),
                "No LLM credentials, using heuristic verdict"
            );
            return heuristic(incident);
        }

        let prompt = match self.prompts.build(incident) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(incident_id = %incident.id, error = %e, "Failed to build triage prompt");
                return heuristic(incident);
            }
        };
        let messages = prompt.messages();
        let options = GenerateOptions {
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
            json_mode: true,
        };

        for model in self.models() {
            let response = match self.provider.generate_text(model, &messages, &options).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(incident_id = %incident.id, model, error = %e, "Model call failed");
                    continue;
                }
            };

            match parse_verdict(&response.text) {
                Ok(verdict) => {
                    let verdict = self.guardrails.apply(verdict, incident);
                    info!(
                        incident_id = %incident.id,
                        model,
                        should_create_ticket = verdict.should_create_ticket,
                        priority = %verdict.priority,
                        tokens = response.usage.total_tokens,
                        "Incident triaged"
                    );
                    return Triage {
                        verdict,
                        origin: VerdictOrigin::Model(model.to_string()),
                    };
                }
                Err(e) => {
                    warn!(incident_id = %incident.id, model, error = %e, "Model reply rejected");
                }
            }
        }

        heuristic(incident)
    }

    fn models(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.settings.primary_model.as_str()).chain(
            self.settings
                .fallback_model
                .as_deref()
                .filter(|m| *m != self.settings.primary_model),
        )
    }
}

fn heuristic(incident: &Incident) -> Triage {
    let verdict = TriageVerdict::heuristic(incident);
    info!(
        incident_id = %incident.id,
        should_create_ticket = verdict.should_create_ticket,
        priority = %verdict.priority,
        "Using heuristic verdict"
    );
    Triage {
        verdict,
        origin: VerdictOrigin::Heuristic,
    }
}

/// Parse a model reply. Only the four verdict fields are accepted.
pub fn parse_verdict(text: &str) -> Result<TriageVerdict, VerdictError> {
    let verdict: TriageVerdict = serde_json::from_str(strip_code_fences(text))?;
    if verdict.ticket_title.trim().is_empty() {
        return Err(VerdictError::EmptyTitle);
    }
    Ok(verdict)
}
