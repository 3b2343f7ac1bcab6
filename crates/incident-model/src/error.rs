//! Error types for parsing model values.

use thiserror::Error;

/// Errors raised when a string does not name a known model value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Invalid severity: '{0}'")]
    InvalidSeverity(String),

    #[error("Invalid priority: '{0}'")]
    InvalidPriority(String),

    #[error("Invalid ticket status: '{0}'")]
    InvalidStatus(String),

    #[error("Invalid repository '{0}': expected owner/repo")]
    InvalidRepository(String),
}
