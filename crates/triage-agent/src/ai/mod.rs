//! Chat-completion providers used by the triage engine.

pub mod openai;
pub mod provider;

pub use openai::{OpenAiCompatibleProvider, DEFAULT_CHAT_COMPLETIONS_URL};
pub use provider::{
    strip_code_fences, AIMessage, AIProvider, AIResponse, AIRole, GenerateOptions, TokenUsage,
};
