use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Loaded from the config file, then patched by env vars and CLI flags.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub pkgsite: PkgsiteConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    /// Load config from default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// A non-empty token from the CLI (or `GITHUB_TOKEN`) beats the file
    pub fn apply_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.github.token = Some(token);
        }
    }

    /// `<config dir>/pkgscout/config.toml`
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("pkgscout");

        Ok(config_dir.join("config.toml"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts per request, first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between attempts when the server doesn't say otherwise
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_user_agent() -> String {
    format!("pkgscout/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token. Without one we scrape the public pages.
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    #[serde(default = "default_github_web_url")]
    pub web_url: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_web_url() -> String {
    "https://github.com".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_api_url(),
            web_url: default_github_web_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PkgsiteConfig {
    #[serde(default = "default_pkgsite_url")]
    pub base_url: String,
}

fn default_pkgsite_url() -> String {
    "https://pkg.go.dev".to_string()
}

impl Default for PkgsiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_pkgsite_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How many repositories to report when `-n` isn't given
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Star lookups in flight at once. 1 keeps things sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_limit() -> usize {
    10
}

fn default_concurrency() -> usize {
    1
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            concurrency: default_concurrency(),
        }
    }
}
