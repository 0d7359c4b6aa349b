use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where canonical repository URLs point
pub const GITHUB_URL: &str = "https://github.com";

/// A GitHub repository, identified by its full name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawReference")]
pub struct RepositoryReference {
    owner: String,
    name: String,
}

// Deserialized references go through `new` like every other one
#[derive(Deserialize)]
struct RawReference {
    owner: String,
    name: String,
}

impl TryFrom<RawReference> for RepositoryReference {
    type Error = Error;

    fn try_from(raw: RawReference) -> Result<Self> {
        Self::new(raw.owner, raw.name)
    }
}

impl RepositoryReference {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() {
            return Err(Error::InvalidRepository(format!("{}/{}", owner, name)));
        }
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    pub fn url(&self) -> String {
        format!("{}/{}", GITHUB_URL, self.full_name())
    }
}

impl std::fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A repository plus whatever enrichment managed to find out about it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRepository {
    pub reference: RepositoryReference,
    /// `None` until a lookup succeeds
    pub stars: Option<u64>,
    /// Why the lookup failed, if it did
    pub error: Option<String>,
}

impl EnrichedRepository {
    pub fn new(reference: RepositoryReference) -> Self {
        Self {
            reference,
            stars: None,
            error: None,
        }
    }

    pub fn with_stars(reference: RepositoryReference, stars: u64) -> Self {
        Self {
            reference,
            stars: Some(stars),
            error: None,
        }
    }

    pub fn failed(reference: RepositoryReference, error: impl Into<String>) -> Self {
        Self {
            reference,
            stars: None,
            error: Some(error.into()),
        }
    }

    /// Unknown counts rank (and render) as zero
    pub fn star_count(&self) -> u64 {
        self.stars.unwrap_or(0)
    }
}

/// One rendered row. `rank` is 1-based and equals the position in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRepository {
    pub rank: usize,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub stars: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one discover → enrich → rank pass
#[derive(Debug, Clone)]
pub struct SearchRun {
    pub package: String,
    pub elapsed: Duration,
    pub generated_at: DateTime<Utc>,
    pub repositories: Vec<EnrichedRepository>,
}

impl SearchRun {
    pub fn ranked(&self) -> Vec<RankedRepository> {
        rank_rows(&self.repositories)
    }
}

pub fn rank_rows(repositories: &[EnrichedRepository]) -> Vec<RankedRepository> {
    repositories
        .iter()
        .enumerate()
        .map(|(i, repo)| RankedRepository {
            rank: i + 1,
            owner: repo.reference.owner().to_string(),
            name: repo.reference.name().to_string(),
            full_name: repo.reference.full_name(),
            stars: repo.star_count(),
            url: repo.reference.url(),
            error: repo.error.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_derives_full_name_and_url() {
        let repo = RepositoryReference::new("gin-gonic", "gin").unwrap();
        assert_eq!(repo.full_name(), "gin-gonic/gin");
        assert_eq!(repo.url(), "https://github.com/gin-gonic/gin");
        assert_eq!(repo.to_string(), "gin-gonic/gin");
    }

    #[test]
    fn test_deserialized_reference_is_validated() {
        let repo: RepositoryReference =
            serde_json::from_str(r#"{"owner":"spf13","name":"cobra"}"#).unwrap();
        assert_eq!(repo.full_name(), "spf13/cobra");

        let err = serde_json::from_str::<RepositoryReference>(r#"{"owner":"","name":"cobra"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("/cobra"));
    }

    #[test]
    fn test_reference_rejects_empty_parts() {
        assert!(RepositoryReference::new("", "gin").is_err());
        assert!(RepositoryReference::new("gin-gonic", "").is_err());
    }

    #[test]
    fn test_unknown_stars_count_as_zero() {
        let repo = EnrichedRepository::new(RepositoryReference::new("a", "b").unwrap());
        assert_eq!(repo.stars, None);
        assert_eq!(repo.star_count(), 0);
    }

    #[test]
    fn test_ranks_are_one_based_positions() {
        let run = SearchRun {
            package: "net/http".to_string(),
            elapsed: Duration::from_millis(1500),
            generated_at: Utc::now(),
            repositories: vec![
                EnrichedRepository::with_stars(RepositoryReference::new("a", "x").unwrap(), 30),
                EnrichedRepository::failed(RepositoryReference::new("b", "y").unwrap(), "boom"),
            ],
        };

        let rows = run.ranked();
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].url, "https://github.com/a/x");
        assert_eq!(rows[0].stars, 30);
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[1].stars, 0);
        assert_eq!(rows[1].error.as_deref(), Some("boom"));
    }
}
