use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::{
    models::{RankedRepository, SearchRun},
    Result,
};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Markdown,
}

impl ExportFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "table" => Some(ExportFormat::Table),
            "json" => Some(ExportFormat::Json),
            "yaml" | "yml" => Some(ExportFormat::Yaml),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Table => "table",
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Markdown => "markdown",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("invalid output format: {}", s))
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What JSON and YAML consumers get
#[derive(Debug, Serialize)]
struct Report<'a> {
    package: &'a str,
    elapsed: String,
    elapsed_ms: u64,
    generated_at: DateTime<Utc>,
    repositories: Vec<RankedRepository>,
}

/// One table line
#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "No")]
    rank: usize,
    #[tabled(rename = "User")]
    owner: String,
    #[tabled(rename = "Repository")]
    name: String,
    #[tabled(rename = "Stargazers")]
    stars: u64,
    #[tabled(rename = "URL")]
    url: String,
}

impl From<RankedRepository> for ReportRow {
    fn from(repo: RankedRepository) -> Self {
        Self {
            rank: repo.rank,
            owner: repo.owner,
            name: repo.name,
            stars: repo.stars,
            url: repo.url,
        }
    }
}

/// Renders a finished run
pub struct Exporter;

impl Exporter {
    pub fn render(run: &SearchRun, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Table => Ok(Self::to_table(run)),
            ExportFormat::Json => Self::to_json(run),
            ExportFormat::Yaml => Self::to_yaml(run),
            ExportFormat::Markdown => Ok(Self::to_markdown(run)),
        }
    }

    pub fn to_json(run: &SearchRun) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&Self::report(run))?;
        out.push('\n');
        Ok(out)
    }

    pub fn to_yaml(run: &SearchRun) -> Result<String> {
        Ok(serde_yaml::to_string(&Self::report(run))?)
    }

    pub fn to_table(run: &SearchRun) -> String {
        let mut table = Table::new(Self::rows(run.ranked()));
        table.with(Style::rounded());

        format!("{}\n{}\n", Self::summary_line(run), table)
    }

    pub fn to_markdown(run: &SearchRun) -> String {
        format!(
            "**Package:** `{}` | **Elapsed:** {} | **Generated:** {}\n\n{}\n",
            run.package,
            format_elapsed(run),
            run.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            Self::markdown_table(&run.ranked())
        )
    }

    /// Bare markdown table, shared with README generation
    pub fn markdown_table(repos: &[RankedRepository]) -> String {
        let mut table = Table::new(Self::rows(repos.to_vec()));
        table.with(Style::markdown());
        table.to_string()
    }

    fn summary_line(run: &SearchRun) -> String {
        format!(
            "Package: {}  Elapsed: {}  Generated: {}",
            run.package,
            format_elapsed(run),
            run.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    fn rows(repos: Vec<RankedRepository>) -> Vec<ReportRow> {
        repos.into_iter().map(ReportRow::from).collect()
    }

    fn report(run: &SearchRun) -> Report<'_> {
        Report {
            package: &run.package,
            elapsed: format_elapsed(run),
            elapsed_ms: run.elapsed.as_millis() as u64,
            generated_at: run.generated_at,
            repositories: run.ranked(),
        }
    }
}

fn format_elapsed(run: &SearchRun) -> String {
    format!("{:.2?}", run.elapsed)
}
