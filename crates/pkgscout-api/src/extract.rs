// Markup scraping. These pages are not an API and change whenever they like,
// so all the selector knowledge lives in this one file.
use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::error::{ApiError, Result};

/// Path marker pkg.go.dev uses for packages hosted on GitHub
pub const GITHUB_MARKER: &str = "/github.com/";

/// Importer entries in the listing. Breadcrumbs and the "Repository" header
/// link point at the package itself and don't carry this class.
const LISTING_ANCHOR: &str = "a.u-breakWord[href]";

/// Pull `(owner, name)` pairs out of an "imported by" listing.
///
/// Only listing anchors whose `href` contains [`GITHUB_MARKER`] count. Duplicates are
/// dropped by full name; the first occurrence keeps its position.
pub fn extract_repository_refs(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(LISTING_ANCHOR).expect("selector should parse");

    let mut visited = HashSet::new();
    let mut repos = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(idx) = href.find(GITHUB_MARKER) else {
            continue;
        };

        let mut segments = href[idx + GITHUB_MARKER.len()..]
            .split('/')
            .map(|s| s.split(['?', '#']).next().unwrap_or_default());
        let (Some(owner), Some(name)) = (segments.next(), segments.next()) else {
            continue;
        };
        if owner.is_empty() || name.is_empty() {
            continue;
        }

        if visited.insert(format!("{}/{}", owner, name)) {
            repos.push((owner.to_string(), name.to_string()));
        }
    }

    repos
}

/// Find the star counter on a GitHub repository page.
///
/// GitHub renders several `.Counter` badges (forks, watchers, stars); the one
/// we want sits inside an element whose text mentions "Star". Its `title`
/// carries the exact number, e.g. `"12,345"`.
pub fn extract_star_count(html: &str) -> Result<u64> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(".Counter").expect("selector should parse");

    for counter in document.select(&selector) {
        let mentions_star = counter
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| parent.text().collect::<String>().contains("Star"))
            .unwrap_or(false);
        if !mentions_star {
            continue;
        }

        let Some(title) = counter.value().attr("title") else {
            continue;
        };

        let digits: String = title
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ' ')
            .collect();
        return digits.trim().parse().map_err(|_| {
            ApiError::Parse(format!("cannot parse star count from title {:?}", title))
        });
    }

    Err(ApiError::Parse("cannot find stargazers count".to_string()))
}
