// pkg.go.dev provider - bridges PkgsiteClient with ImporterSource
use async_trait::async_trait;
use pkgscout_api::{ImportedRepo, PkgsiteClient};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{models::RepositoryReference, search::ImporterSource, Error, Result};

/// Wrapper around PkgsiteClient that implements ImporterSource
pub struct PkgsiteProvider {
    client: PkgsiteClient,
}

impl PkgsiteProvider {
    pub fn new(client: PkgsiteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImporterSource for PkgsiteProvider {
    async fn imported_by(
        &self,
        package: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryReference>> {
        let repos = self
            .client
            .imported_by(package, cancel)
            .await
            .map_err(|e| Error::discovery(package, e))?;

        Ok(repos.into_iter().filter_map(imported_to_ref).collect())
    }
}

/// The extractor already drops empty segments, but the model gets the final say
fn imported_to_ref(repo: ImportedRepo) -> Option<RepositoryReference> {
    match RepositoryReference::new(repo.owner, repo.name) {
        Ok(reference) => Some(reference),
        Err(e) => {
            debug!("Skipping listing entry: {}", e);
            None
        }
    }
}
