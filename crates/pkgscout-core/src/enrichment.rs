// Star-count enrichment with a cache in front of the network
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use pkgscout_cache::StarCountCache;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    models::{EnrichedRepository, RepositoryReference},
    search::StarCountSource,
    Result,
};

/// Progress gets logged every this many repositories
const PROGRESS_EVERY: usize = 100;

/// Resolves star counts, asking the cache before the source
pub struct StarCounter {
    source: Arc<dyn StarCountSource>,
    cache: Arc<StarCountCache>,
}

impl StarCounter {
    pub fn new(source: Arc<dyn StarCountSource>, cache: Arc<StarCountCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<StarCountCache> {
        &self.cache
    }

    /// Star count for one repository. Cache hits never touch the network.
    pub async fn star_count(
        &self,
        repo: &RepositoryReference,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let full_name = repo.full_name();
        if let Some(count) = self.cache.get(&full_name) {
            debug!("Cache hit for {}", full_name);
            return Ok(count);
        }

        let count = self.source.star_count(repo, cancel).await?;
        Ok(self.cache.insert(&full_name, count))
    }

    /// Enrich one repository. Lookup failures are logged and recorded on the
    /// entry; only cancellation comes back as an error.
    pub async fn enrich(
        &self,
        repo: RepositoryReference,
        cancel: &CancellationToken,
    ) -> Result<EnrichedRepository> {
        match self.star_count(&repo, cancel).await {
            Ok(count) => Ok(EnrichedRepository::with_stars(repo, count)),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                if e.is_not_found() {
                    debug!("Skipping {}: {}", repo, e);
                } else {
                    warn!("failed to get {} stargazers count: {}", repo, e);
                }
                Ok(EnrichedRepository::failed(repo, e.to_string()))
            }
        }
    }

    /// Enrich every repository, keeping the input order.
    ///
    /// `concurrency` bounds the number of lookups in flight; 1 means strictly
    /// one after another. Cancellation aborts the whole batch and throws away
    /// whatever was collected so far.
    pub async fn enrich_all(
        &self,
        repos: Vec<RepositoryReference>,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<EnrichedRepository>> {
        let total = repos.len();
        let mut enriched = Vec::with_capacity(total);

        let mut lookups = stream::iter(repos)
            .map(|repo| self.enrich(repo, cancel))
            .buffered(concurrency.max(1));

        while let Some(result) = lookups.next().await {
            if enriched.len() % PROGRESS_EVERY == 0 {
                info!("processed repositories: {}/{}", enriched.len(), total);
            }
            enriched.push(result?);
        }

        Ok(enriched)
    }
}
