//! GitHub Issues REST client.

use std::time::Duration;

use async_trait::async_trait;
use incident_model::RepositoryName;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use crate::errors::{Result, TicketingError};
use crate::tracker::{Comment, Issue, IssueQuery, IssueTracker, NewIssue};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Issue client bound to one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: String,
    repository: RepositoryName,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: &str, repository: RepositoryName) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("incident-ticketing/1.0"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            repository,
        })
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    fn issues_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues",
            self.base_url, self.repository.owner, self.repository.repo
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(TicketingError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json().await?)
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn create_issue(&self, issue: &NewIssue) -> Result<Issue> {
        let response = self
            .client
            .post(self.issues_url())
            .header(AUTHORIZATION, self.bearer())
            .json(issue)
            .send()
            .await?;
        let created: Issue = parse(response).await?;
        info!(
            repository = %self.repository,
            number = created.number,
            "Created GitHub issue"
        );
        Ok(created)
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<Comment> {
        let response = self
            .client
            .post(format!("{}/{number}/comments", self.issues_url()))
            .header(AUTHORIZATION, self.bearer())
            .json(&json!({ "body": body }))
            .send()
            .await?;
        parse(response).await
    }

    async fn add_labels(&self, number: u64, labels: &[String]) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/{number}/labels", self.issues_url()))
            .header(AUTHORIZATION, self.bearer())
            .json(&json!({ "labels": labels }))
            .send()
            .await?;
        let _: serde_json::Value = parse(response).await?;
        debug!(number, ?labels, "Added labels");
        Ok(())
    }

    async fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let per_page = query.per_page.to_string();
        let labels = query.labels.join(",");
        let response = self
            .client
            .get(self.issues_url())
            .header(AUTHORIZATION, self.bearer())
            .query(&[
                ("labels", labels.as_str()),
                ("state", "all"),
                ("per_page", per_page.as_str()),
                ("sort", "created"),
                ("direction", "desc"),
            ])
            .send()
            .await?;
        parse(response).await
    }
}
