use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pkgscout_api::{
    GitHubClient, HttpError, HttpRequest, HttpResponse, HttpTransport, PkgsiteClient, RetryPolicy,
};
use pkgscout_cache::StarCountCache;
use pkgscout_core::{
    providers::{GitHubProvider, PkgsiteProvider},
    readme, ComparisonFilter, Error, RepositoryReference, SearchEngine, SearchOptions,
    StarCounter,
};
use tokio_util::sync::CancellationToken;

/// Serves fixed responses by URL and counts hits
#[derive(Default)]
struct FakeWeb {
    pages: HashMap<String, HttpResponse>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FakeWeb {
    fn page(mut self, url: &str, response: HttpResponse) -> Self {
        self.pages.insert(url.to_string(), response);
        self
    }

    fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HttpTransport for FakeWeb {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        *self
            .hits
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_insert(0) += 1;
        Ok(self
            .pages
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404)))
    }
}

fn star_page(count: &str) -> HttpResponse {
    HttpResponse::new(200).with_body(format!(
        r#"<ul><li><a href="/stargazers">Star <span class="Counter" title="{}">x</span></a></li></ul>"#,
        count
    ))
}

fn listing(links: &[&str]) -> HttpResponse {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a class="u-breakWord" href="/github.com/{}">{}</a>"#, l, l))
        .collect();
    HttpResponse::new(200).with_body(format!("<html><body>{}</body></html>", anchors))
}

fn engine(web: Arc<FakeWeb>) -> SearchEngine {
    let retry = RetryPolicy::new(3, Duration::from_millis(1));
    let pkgsite = PkgsiteClient::with_base_url(web.clone(), "https://pkg.test".into())
        .with_retry_policy(retry.clone());
    let github = GitHubClient::with_base_urls(
        web,
        None,
        "https://api.gh.test".into(),
        "https://gh.test".into(),
    )
    .with_retry_policy(retry);

    SearchEngine::new(
        Arc::new(PkgsiteProvider::new(pkgsite)),
        StarCounter::new(
            Arc::new(GitHubProvider::new(github)),
            Arc::new(StarCountCache::new()),
        ),
    )
}

fn sample_web() -> FakeWeb {
    FakeWeb::default()
        .page(
            "https://pkg.test/example.com/lib?tab=importedby",
            listing(&[
                "alpha/one/pkg",
                "beta/two",
                "alpha/one/cmd/tool",
                "gamma/three",
                "delta/missing",
            ]),
        )
        .page("https://gh.test/alpha/one", star_page("1,200"))
        .page("https://gh.test/beta/two", star_page("35"))
        .page("https://gh.test/gamma/three", star_page("410"))
}

#[tokio::test]
async fn test_end_to_end_ranking() {
    let web = Arc::new(sample_web());
    let engine = engine(web.clone());

    let run = engine
        .run(&SearchOptions::new("example.com/lib"), &CancellationToken::new())
        .await
        .unwrap();

    let rows = run.ranked();
    let names: Vec<&str> = rows.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["alpha/one", "gamma/three", "beta/two", "delta/missing"]
    );
    assert_eq!(rows[0].stars, 1200);
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[3].stars, 0);
    assert!(rows[3].error.is_some());

    // The duplicate listing entry was fetched once
    assert_eq!(web.hits("https://gh.test/alpha/one"), 1);
}

#[tokio::test]
async fn test_limit_then_filter_end_to_end() {
    let engine = engine(Arc::new(sample_web()));

    let options = SearchOptions {
        package: "example.com/lib".to_string(),
        limit: 2,
        filter: ComparisonFilter::parse(">=400").unwrap(),
        concurrency: 3,
    };
    let run = engine.run(&options, &CancellationToken::new()).await.unwrap();

    let stars: Vec<u64> = run.ranked().iter().map(|r| r.stars).collect();
    assert_eq!(stars, vec![1200, 410]);
}

#[tokio::test]
async fn test_cache_makes_second_lookup_free() {
    let web = Arc::new(sample_web());
    let engine = engine(web.clone());
    let counter = engine.star_counter();
    let repo = RepositoryReference::new("beta", "two").unwrap();
    let cancel = CancellationToken::new();

    let first = counter.star_count(&repo, &cancel).await.unwrap();
    let second = counter.star_count(&repo, &cancel).await.unwrap();

    assert_eq!(first, 35);
    assert_eq!(second, 35);
    assert_eq!(web.hits("https://gh.test/beta/two"), 1);
    assert_eq!(counter.cache().get("beta/two"), Some(35));
}

#[tokio::test]
async fn test_discovery_404_names_the_stage() {
    let engine = engine(Arc::new(FakeWeb::default()));

    let err = engine
        .run(&SearchOptions::new("nowhere/pkg"), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Discovery { .. }));
    assert!(err.to_string().starts_with("discovery failed for nowhere/pkg"));
}

#[tokio::test]
async fn test_cancelled_run_reports_cancellation() {
    let engine = engine(Arc::new(sample_web()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine
        .run(&SearchOptions::new("example.com/lib"), &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_readme_collects_and_records_failures() {
    let engine = engine(Arc::new(sample_web()));
    let categories = readme::parse_categories(
        r#"
- category: Libraries
  packages:
    - name: Example Lib
      url: example.com/lib
      options:
        limit: 3
        stars: "not a filter"
    - name: Ghost
      url: ghost.dev/pkg
"#,
    )
    .unwrap();

    let sections = readme::collect(&engine, categories, 1, &CancellationToken::new())
        .await
        .unwrap();

    let lib = &sections[0].packages[0];
    let repos = lib.outcome.as_ref().unwrap();
    assert_eq!(repos.len(), 3);
    assert_eq!(repos[0].reference.full_name(), "alpha/one");

    assert!(sections[0].packages[1].outcome.is_err());

    let md = readme::render("", &sections);
    assert!(md.contains("### Example Lib"));
    assert!(md.contains("fetch error: discovery failed for ghost.dev/pkg"));
}
