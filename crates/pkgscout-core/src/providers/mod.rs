// Provider implementations - bridge the API clients to the pipeline traits
pub mod github;
pub mod pkgsite;

pub use github::GitHubProvider;
pub use pkgsite::PkgsiteProvider;
