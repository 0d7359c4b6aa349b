use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pkgscout_api::{GitHubClient, HttpTransport, PkgsiteClient, ReqwestTransport, RetryPolicy};
use pkgscout_cache::StarCountCache;
use pkgscout_core::{
    providers::{GitHubProvider, PkgsiteProvider},
    readme, ComparisonFilter, Config, ExportFormat, Exporter, SearchEngine, SearchOptions,
    StarCounter,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;
mod shutdown;

/// Exit code for a run stopped by a signal, same as a shell would report
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "pkgscout")]
#[command(version, about = "Find popular GitHub repositories importing a Go package", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search GitHub repositories that import a package
    Imported {
        /// Go package, e.g. net/http or github.com/gin-gonic/gin
        #[arg(short = 'p', long = "package")]
        package: String,

        /// Number of retrieved repositories [default: 10]
        #[arg(short = 'n', long = "number")]
        number: Option<usize>,

        /// Star filter applied to the top results: "=N", ">N", ">=N", "<N", "<=N" or "N"
        #[arg(short = 's', long = "stars", default_value = "")]
        stars: String,

        /// Output format: table, json, yaml or markdown
        #[arg(short = 'o', long = "output", default_value = "table")]
        output: ExportFormat,

        /// Directory to write the report into instead of stdout
        #[arg(long = "output-path")]
        output_path: Option<PathBuf>,

        /// GitHub token. Without one, star counts are scraped from public pages.
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Star lookups in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Build the popular-projects README from a package list
    Readme {
        /// YAML list of categories and packages
        #[arg(long, default_value = "packages.yaml")]
        packages: PathBuf,

        /// Markdown placed above the generated index
        #[arg(long)]
        head: Option<PathBuf>,

        /// Where the README goes
        #[arg(long, default_value = "README_PREPARE.md")]
        out: PathBuf,

        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays a clean report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pkgscout=info,pkgscout_core=info,pkgscout_api=info,pkgscout_cache=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    shutdown::install(cancel.clone());

    match run(cli, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_cancelled(&e) => {
            tracing::warn!("Run cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading config")?;

    match cli.command {
        Commands::Imported {
            package,
            number,
            stars,
            output,
            output_path,
            token,
            concurrency,
        } => {
            config.apply_token(token);
            let options = SearchOptions {
                package,
                limit: number.unwrap_or(config.search.default_limit),
                filter: ComparisonFilter::parse(&stars).context("parsing --stars")?,
                concurrency: concurrency.unwrap_or(config.search.concurrency),
            };
            info!(
                "Search imported github repositories. limit: {}, package: {}",
                options.limit, options.package
            );

            let engine = build_engine(&config)?;
            let search = engine.run(&options, cancel).await?;
            let rendered = Exporter::render(&search, output)?;

            let written =
                output::write_report(&rendered, output_path.as_deref(), &search.package)?;
            if let Some(path) = written {
                info!("Report written to {}", path.display());
            }
        }
        Commands::Readme {
            packages,
            head,
            out,
            token,
        } => {
            config.apply_token(token);
            let yaml = std::fs::read_to_string(&packages)
                .with_context(|| format!("reading {}", packages.display()))?;
            let categories = readme::parse_categories(&yaml)
                .with_context(|| format!("parsing {}", packages.display()))?;
            let head = match head {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => String::new(),
            };

            let engine = build_engine(&config)?;
            let sections =
                readme::collect(&engine, categories, config.search.concurrency, cancel).await?;

            std::fs::write(&out, readme::render(&head, &sections))
                .with_context(|| format!("writing {}", out.display()))?;
            info!("README written to {}", out.display());
        }
    }

    Ok(())
}

/// Wire the real HTTP clients into the pipeline
fn build_engine(config: &Config) -> anyhow::Result<SearchEngine> {
    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::new(&config.http.user_agent, config.http.timeout())
            .context("building HTTP client")?,
    );
    let retry = RetryPolicy::new(config.http.max_attempts, config.http.backoff());

    let pkgsite = PkgsiteClient::with_base_url(transport.clone(), config.pkgsite.base_url.clone())
        .with_retry_policy(retry.clone());
    let github = GitHubClient::with_base_urls(
        transport,
        config.github.token.clone(),
        config.github.api_url.clone(),
        config.github.web_url.clone(),
    )
    .with_retry_policy(retry);

    if github.has_token() {
        info!("Using the GitHub API for star counts");
    } else {
        info!("No GitHub token, scraping star counts from public pages");
    }

    Ok(SearchEngine::new(
        Arc::new(PkgsiteProvider::new(pkgsite)),
        StarCounter::new(
            Arc::new(GitHubProvider::new(github)),
            Arc::new(StarCountCache::new()),
        ),
    ))
}

fn is_cancelled(err: &anyhow::Error) -> bool {
    err.downcast_ref::<pkgscout_core::Error>()
        .map(|e| e.is_cancelled())
        .unwrap_or(false)
}
