// HTTP plumbing and the two upstreams we scrape: pkg.go.dev and GitHub
pub mod error;
pub mod extract;
pub mod github;
pub mod http;
pub mod pkgsite;
pub mod retry;

// Re-export common types
pub use error::{ApiError, Result};
pub use github::GitHubClient;
pub use http::{HttpError, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use pkgsite::{ImportedRepo, PkgsiteClient};
pub use retry::{execute_with_retry, RetryPolicy, DEFAULT_BACKOFF};
