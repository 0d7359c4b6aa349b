// GitHub client - we only care about one number per repository
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::extract::extract_star_count;
use crate::http::{HttpRequest, HttpTransport};
use crate::retry::{execute_with_retry, RetryPolicy};

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const GITHUB_WEB_BASE: &str = "https://github.com";

/// The slice of `GET /repos/{owner}/{repo}` we actually read
#[derive(Debug, Deserialize)]
pub struct GitHubRepoStats {
    pub stargazers_count: u64,
}

pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: Option<String>,
    api_url: String,
    web_url: String,
    retry_policy: RetryPolicy,
}

impl GitHubClient {
    pub fn new(transport: Arc<dyn HttpTransport>, token: Option<String>) -> Self {
        Self::with_base_urls(
            transport,
            token,
            GITHUB_API_BASE.to_string(),
            GITHUB_WEB_BASE.to_string(),
        )
    }

    /// For GitHub Enterprise and tests
    pub fn with_base_urls(
        transport: Arc<dyn HttpTransport>,
        token: Option<String>,
        api_url: String,
        web_url: String,
    ) -> Self {
        Self {
            transport,
            // An empty token is the same as no token
            token: token.filter(|t| !t.trim().is_empty()),
            api_url: api_url.trim_end_matches('/').to_string(),
            web_url: web_url.trim_end_matches('/').to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Star count via the REST API when we have a token, otherwise scrape the
    /// public repository page.
    pub async fn star_count(
        &self,
        owner: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        match &self.token {
            Some(token) => self.star_count_from_api(token, owner, name, cancel).await,
            None => self.star_count_from_page(owner, name, cancel).await,
        }
    }

    async fn star_count_from_api(
        &self,
        token: &str,
        owner: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let url = format!("{}/repos/{}/{}", self.api_url, owner, name);
        debug!("Fetching star count from {}", url);

        let response = execute_with_retry(&self.retry_policy, cancel, || {
            let request = HttpRequest::get(url.clone())
                .header("Authorization", format!("Bearer {}", token))
                .header("Accept", "application/vnd.github+json");
            self.transport.send(request)
        })
        .await?;

        let stats: GitHubRepoStats = serde_json::from_slice(&response.body)?;
        Ok(stats.stargazers_count)
    }

    async fn star_count_from_page(
        &self,
        owner: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let url = format!("{}/{}/{}", self.web_url, owner, name);
        debug!("Scraping star count from {}", url);

        let response = execute_with_retry(&self.retry_policy, cancel, || {
            self.transport.send(HttpRequest::get(url.clone()))
        })
        .await?;

        if response.status != 200 {
            return Err(ApiError::UnexpectedStatus {
                url,
                status: response.status,
            });
        }

        extract_star_count(&response.text())
    }
}
