//! Error types for the tool transport and client.

use std::time::Duration;

use thiserror::Error;

/// Failures of the request/response channel to a tool provider.
///
/// A reply whose payload cannot be decoded is reported here too, not as a
/// tool failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to spawn provider '{provider}': {source}")]
    Spawn {
        provider: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on provider channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider channel closed")]
    Closed,

    #[error("Request '{method}' timed out after {timeout:?}")]
    Timeout { method: String, timeout: Duration },

    #[error("Provider returned JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Failed to decode reply of '{tool}': {reason}")]
    Decode { tool: String, reason: String },

    #[error("Handshake with provider '{provider}' failed: {reason}")]
    Handshake { provider: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    pub(crate) fn decode(tool: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
