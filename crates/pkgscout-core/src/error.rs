use pkgscout_api::ApiError;
use thiserror::Error;

/// All the ways a pkgscout run can go wrong
///
/// Each variant names the stage that failed, so the one line the user sees
/// at exit is enough to tell discovery trouble from a typo in `--stars`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("discovery failed for {package}: {source}")]
    Discovery {
        package: String,
        #[source]
        source: ApiError,
    },

    #[error("star count lookup failed for {full_name}: {source}")]
    Enrichment {
        full_name: String,
        #[source]
        source: ApiError,
    },

    #[error("'{character}' invalid character at {position}")]
    InvalidFilter { character: char, position: usize },

    #[error("star filter value out of range: {0}")]
    InvalidFilterValue(String),

    #[error("unrecognized operator {operator:?} in star filter {expression:?}")]
    FilterInternal { expression: String, operator: String },

    #[error("invalid repository reference: {0}")]
    InvalidRepository(String),

    #[error("run cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap a discovery failure, keeping cancellation recognizable
    pub fn discovery(package: &str, source: ApiError) -> Self {
        if source.is_cancelled() {
            return Error::Cancelled;
        }
        Error::Discovery {
            package: package.to_string(),
            source,
        }
    }

    /// Wrap an enrichment failure, keeping cancellation recognizable
    pub fn enrichment(full_name: &str, source: ApiError) -> Self {
        if source.is_cancelled() {
            return Error::Cancelled;
        }
        Error::Enrichment {
            full_name: full_name.to_string(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Discovery { source, .. } | Error::Enrichment { source, .. } => {
                source.is_not_found()
            }
            _ => false,
        }
    }
}
