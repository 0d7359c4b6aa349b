// Core business logic lives here - discover, enrich, rank, report
pub mod config;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod filter;
pub mod models;
pub mod providers;
pub mod readme;
pub mod search;

pub use config::Config;
pub use enrichment::StarCounter;
pub use error::Error;
pub use export::{ExportFormat, Exporter};
pub use filter::{Comparison, ComparisonFilter};
pub use models::{EnrichedRepository, RankedRepository, RepositoryReference, SearchRun};
pub use search::{ImporterSource, SearchEngine, SearchOptions, StarCountSource};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
