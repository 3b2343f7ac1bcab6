//! Startup configuration of the ticketing provider.

use std::path::PathBuf;

use incident_model::RepositoryName;

use crate::errors::{Result, TicketingError};
use crate::github::DEFAULT_GITHUB_API_URL;

pub const DEFAULT_LEDGER_PATH: &str = ".ticketing/ledger.json";

#[derive(Debug, Clone)]
pub struct TicketingConfig {
    pub repository: RepositoryName,
    pub token: String,
    pub api_url: String,
    pub ledger_path: PathBuf,
}

impl TicketingConfig {
    /// Validate raw settings. A missing repository or token is fatal.
    pub fn from_parts(
        repository: Option<&str>,
        token: Option<&str>,
        api_url: Option<&str>,
        ledger_path: Option<PathBuf>,
    ) -> Result<Self> {
        let repository = repository
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                TicketingError::Config(
                    "no repository configured (set --repository or TICKETING_REPOSITORY)"
                        .to_string(),
                )
            })?
            .parse::<RepositoryName>()?;

        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TicketingError::Config("GITHUB_TOKEN is not set".to_string()))?
            .to_string();

        let api_url = api_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_GITHUB_API_URL)
            .to_string();

        Ok(Self {
            repository,
            token,
            api_url,
            ledger_path: ledger_path.unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = TicketingConfig::from_parts(Some("acme/ops"), Some("t"), None, None).unwrap();
        assert_eq!(config.repository.full_name(), "acme/ops");
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.ledger_path, PathBuf::from(".ticketing/ledger.json"));
    }

    #[test]
    fn test_missing_identity_is_fatal() {
        assert!(matches!(
            TicketingConfig::from_parts(None, Some("t"), None, None),
            Err(TicketingError::Config(_))
        ));
        assert!(matches!(
            TicketingConfig::from_parts(Some("acme/ops"), Some("  "), None, None),
            Err(TicketingError::Config(_))
        ));
        assert!(matches!(
            TicketingConfig::from_parts(Some("not-a-repo"), Some("t"), None, None),
            Err(TicketingError::Model(_))
        ));
    }
}
