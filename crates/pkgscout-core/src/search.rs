use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    enrichment::StarCounter,
    filter::ComparisonFilter,
    models::{EnrichedRepository, RepositoryReference, SearchRun},
    Error, Result,
};

/// Where the list of importing repositories comes from
///
/// pkg.go.dev today; anything that can list importers tomorrow.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImporterSource: Send + Sync {
    async fn imported_by(
        &self,
        package: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryReference>>;
}

/// Where star counts come from
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StarCountSource: Send + Sync {
    async fn star_count(
        &self,
        repo: &RepositoryReference,
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Knobs for a single search
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub package: String,
    pub limit: usize,
    pub filter: Option<ComparisonFilter>,
    pub concurrency: usize,
}

impl SearchOptions {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            ..Self::default()
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            package: String::new(),
            limit: 10,
            filter: None,
            concurrency: 1,
        }
    }
}

/// Runs discovery, enrichment and ranking for a package
pub struct SearchEngine {
    importers: Arc<dyn ImporterSource>,
    stars: StarCounter,
}

impl SearchEngine {
    pub fn new(importers: Arc<dyn ImporterSource>, stars: StarCounter) -> Self {
        Self { importers, stars }
    }

    pub fn star_counter(&self) -> &StarCounter {
        &self.stars
    }

    /// Repositories importing `package`, in the order the listing shows them
    pub async fn discover(
        &self,
        package: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RepositoryReference>> {
        let repos = self.importers.imported_by(package, cancel).await?;
        info!("> imported repositories: {}", repos.len());
        Ok(repos)
    }

    /// Discover, enrich, then sort → limit → filter.
    ///
    /// Any error (including cancellation) throws away partial results.
    pub async fn run(
        &self,
        options: &SearchOptions,
        cancel: &CancellationToken,
    ) -> Result<SearchRun> {
        if options.package.is_empty() {
            return Err(Error::ConfigError("required package".to_string()));
        }

        let started = Instant::now();
        let discovered = self.discover(&options.package, cancel).await?;
        let enriched = self
            .stars
            .enrich_all(discovered, options.concurrency, cancel)
            .await?;
        let repositories = rank(enriched, options.limit, options.filter.as_ref());
        let elapsed = started.elapsed();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        Ok(SearchRun {
            package: options.package.clone(),
            elapsed,
            generated_at: Utc::now(),
            repositories,
        })
    }
}

/// Sort by stars (descending, stable), truncate to `limit`, then filter.
///
/// The limit is applied BEFORE the filter: the filter only ever sees the
/// top `limit` repositories, so it can shrink the result but never pull in
/// anything from further down the list.
pub fn rank(
    mut repos: Vec<EnrichedRepository>,
    limit: usize,
    filter: Option<&ComparisonFilter>,
) -> Vec<EnrichedRepository> {
    sort_by_stars(&mut repos);
    repos.truncate(limit);
    match filter {
        Some(filter) => repos
            .into_iter()
            .filter(|repo| filter.matches(repo.star_count()))
            .collect(),
        None => repos,
    }
}

pub fn sort_by_stars(repos: &mut [EnrichedRepository]) {
    repos.sort_by(|a, b| b.star_count().cmp(&a.star_count()));
}
