// README generation - run a search per package in a curated list and lay the
// results out as a "popular projects" page
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    export::Exporter,
    filter::ComparisonFilter,
    models::{rank_rows, EnrichedRepository},
    search::{rank, SearchEngine},
    Result,
};

/// Anchor every package section links back to
const TOP_ANCHOR: &str = "Popular-Projects";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub category: String,
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEntry {
    pub name: String,
    /// Package path as pkg.go.dev knows it
    pub url: String,
    #[serde(default)]
    pub options: PackageOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageOptions {
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Star filter expression; empty or malformed means "no filter"
    #[serde(default)]
    pub stars: String,
}

fn default_limit() -> usize {
    10
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            stars: String::new(),
        }
    }
}

/// Search outcome for one package
#[derive(Debug, Clone)]
pub struct PackageSection {
    pub entry: PackageEntry,
    pub outcome: std::result::Result<Vec<EnrichedRepository>, String>,
}

#[derive(Debug, Clone)]
pub struct CategorySection {
    pub category: String,
    pub packages: Vec<PackageSection>,
}

pub fn parse_categories(yaml: &str) -> Result<Vec<Category>> {
    Ok(serde_yaml::from_str(yaml)?)
}

/// Search every package. A package whose discovery fails gets its error
/// recorded and the rest carry on; cancellation stops everything.
pub async fn collect(
    engine: &SearchEngine,
    categories: Vec<Category>,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<CategorySection>> {
    let mut sections = Vec::with_capacity(categories.len());

    for category in categories {
        info!("Try to search {}", category.category);
        let mut packages = Vec::with_capacity(category.packages.len());

        for entry in category.packages {
            let outcome = match search_package(engine, &entry, concurrency, cancel).await {
                Ok(repos) => Ok(repos),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!("{} ({}) failed: {}", entry.name, entry.url, e);
                    Err(e.to_string())
                }
            };
            packages.push(PackageSection { entry, outcome });
        }

        sections.push(CategorySection {
            category: category.category,
            packages,
        });
    }

    Ok(sections)
}

async fn search_package(
    engine: &SearchEngine,
    entry: &PackageEntry,
    concurrency: usize,
    cancel: &CancellationToken,
) -> Result<Vec<EnrichedRepository>> {
    let discovered = engine.discover(&entry.url, cancel).await?;
    info!(
        "{}({}) imported by repositories: {}",
        entry.name,
        entry.url,
        discovered.len()
    );

    let enriched = engine
        .star_counter()
        .enrich_all(discovered, concurrency, cancel)
        .await?;

    let filter = ComparisonFilter::parse(&entry.options.stars).unwrap_or_else(|e| {
        warn!("Ignoring star filter for {}: {}", entry.name, e);
        None
    });

    Ok(rank(enriched, entry.options.limit, filter.as_ref()))
}

/// Lay the sections out as Markdown, with `head` on top
pub fn render(head: &str, sections: &[CategorySection]) -> String {
    let mut output = String::new();
    output.push_str(head);
    if !head.is_empty() && !head.ends_with('\n') {
        output.push('\n');
    }

    // Index
    output.push_str("# Popular Projects  \n");
    for section in sections {
        output.push_str(&format!(
            "- [{}](#{})\n",
            section.category,
            anchor(&section.category)
        ));
        for package in &section.packages {
            output.push_str(&format!(
                "  - [{}](#{})\n",
                package.entry.name,
                anchor(&package.entry.name)
            ));
        }
    }
    output.push_str("\n---  \n\n");

    for section in sections {
        output.push_str(&format!("## {}\n\n", section.category));
        for package in &section.packages {
            output.push_str(&format!("### {}\n", package.entry.name));
            match &package.outcome {
                Err(e) => {
                    output.push_str(&format!("fetch error: {}\n\n", e));
                    continue;
                }
                Ok(repos) => {
                    output.push_str(&Exporter::markdown_table(&rank_rows(repos)));
                    output.push_str("\n\n");
                }
            }
            output.push_str(&format!("**[⬆ top](#{})**  \n\n\n", TOP_ANCHOR));
        }
        output.push_str("\n\n");
    }

    output
}

fn anchor(title: &str) -> String {
    title.replace(' ', "-")
}
