// GitHub provider - bridges GitHubClient with StarCountSource
use async_trait::async_trait;
use pkgscout_api::GitHubClient;
use tokio_util::sync::CancellationToken;

use crate::{models::RepositoryReference, search::StarCountSource, Error, Result};

/// Wrapper around GitHubClient that implements StarCountSource
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StarCountSource for GitHubProvider {
    async fn star_count(
        &self,
        repo: &RepositoryReference,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        self.client
            .star_count(repo.owner(), repo.name(), cancel)
            .await
            .map_err(|e| Error::enrichment(&repo.full_name(), e))
    }
}
