// pkg.go.dev client - the "imported by" tab is where discovery starts
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::extract::extract_repository_refs;
use crate::http::{HttpRequest, HttpTransport};
use crate::retry::{execute_with_retry, RetryPolicy};

pub const PKGSITE_BASE: &str = "https://pkg.go.dev";

/// A GitHub repository referenced from an "imported by" listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRepo {
    pub owner: String,
    pub name: String,
}

pub struct PkgsiteClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl PkgsiteClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_base_url(transport, PKGSITE_BASE.to_string())
    }

    /// For mirrors and tests
    pub fn with_base_url(transport: Arc<dyn HttpTransport>, base_url: String) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn imported_by_url(&self, package: &str) -> String {
        format!(
            "{}/{}?tab=importedby",
            self.base_url,
            package.trim_matches('/')
        )
    }

    /// Fetch the listing page and return the repositories it links to, in
    /// first-seen order with duplicates removed.
    pub async fn imported_by(
        &self,
        package: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ImportedRepo>> {
        let url = self.imported_by_url(package);
        debug!("Fetching importers from {}", url);

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

        let repos = extract_repository_refs(&response.text())
            .into_iter()
            .map(|(owner, name)| ImportedRepo { owner, name })
            .collect();

        Ok(repos)
    }
}
