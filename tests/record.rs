//! Package record integration tests

mod helper;

use std::sync::Arc;
use std::time::Duration;

use mockito::Server;

use helper::{StaticFetcher, create_test_context, create_test_index};
use upstream_check::upstream::alias::AliasTable;
use upstream_check::upstream::error::CheckError;
use upstream_check::upstream::fetcher::HttpFetcher;
use upstream_check::upstream::record::{PackageContext, PackageRecord};
use upstream_check::upstream::summary::SummaryTemplate;
use upstream_check::upstream::types::Comparison;

const CNUCNU_LISTING: &str = r#"
<a href="cnucnu-0.1.tar.gz">cnucnu-0.1.tar.gz</a>
<a href="cnucnu-0.2.tar.gz">cnucnu-0.2.tar.gz</a>
"#;

#[tokio::test]
async fn repeated_queries_fetch_once() {
    let fetcher = Arc::new(
        StaticFetcher::new().with_page("http://example.org/cnucnu/", CNUCNU_LISTING),
    );
    let context = create_test_context(
        fetcher.clone(),
        create_test_index(&[("cnucnu", "0.1", "1.fc20")]),
    );
    let mut record =
        PackageRecord::new("cnucnu", "DEFAULT", "http://example.org/cnucnu/", context).unwrap();

    assert_eq!(record.latest_upstream().await.unwrap(), "0.2");
    assert_eq!(record.comparison().await.unwrap(), Comparison::UpstreamNewer);
    assert!(record.upstream_newer().await.unwrap());
    assert_eq!(record.upstream_versions().await.unwrap().len(), 4);

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(record.fetched_location(), Some("http://example.org/cnucnu/"));
}

#[tokio::test]
async fn changing_pattern_reuses_content() {
    let fetcher = Arc::new(
        StaticFetcher::new().with_page("http://example.org/cnucnu/", CNUCNU_LISTING),
    );
    let context = create_test_context(
        fetcher.clone(),
        create_test_index(&[("cnucnu", "0.2", "1.fc20")]),
    );
    let mut record =
        PackageRecord::new("cnucnu", "DEFAULT", "http://example.org/cnucnu/", context).unwrap();
    assert_eq!(record.comparison().await.unwrap(), Comparison::Equal);

    record.set_pattern(r"cnucnu-(0\.1)\.tar").unwrap();

    assert_eq!(record.latest_upstream().await.unwrap(), "0.1");
    assert_eq!(record.comparison().await.unwrap(), Comparison::PackagedNewer);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn changing_location_fetches_again() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_page("http://example.org/cnucnu/", CNUCNU_LISTING)
            .with_page("http://mirror.example.org/cnucnu/", "cnucnu-0.3.tar.gz"),
    );
    let context = create_test_context(
        fetcher.clone(),
        create_test_index(&[("cnucnu", "0.2", "1.fc20")]),
    );
    let mut record =
        PackageRecord::new("cnucnu", "DEFAULT", "http://example.org/cnucnu/", context).unwrap();
    assert_eq!(record.latest_upstream().await.unwrap(), "0.2");

    record
        .set_location("http://mirror.example.org/cnucnu/")
        .unwrap();

    assert_eq!(record.fetched_location(), None);
    assert_eq!(record.latest_upstream().await.unwrap(), "0.3");
    assert_eq!(record.comparison().await.unwrap(), Comparison::UpstreamNewer);
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn wildcard_location_follows_newest_subdirectory() {
    let fetcher = Arc::new(
        StaticFetcher::new()
            .with_page(
                "http://download.gnome.org/sources/gnome-foo/",
                r#"<a href="3.8/">3.8/</a> <a href="3.10/">3.10/</a> <a href="cache.json">"#,
            )
            .with_page(
                "http://download.gnome.org/sources/gnome-foo/3.10/",
                "gnome-foo-3.10.0.tar.xz gnome-foo-3.10.1.tar.xz",
            ),
    );
    let context = create_test_context(
        fetcher.clone(),
        create_test_index(&[("gnome-foo", "3.10.1", "1.fc20")]),
    );
    let mut record =
        PackageRecord::new("gnome-foo", "DEFAULT", "GNOME-DEFAULT", context).unwrap();

    assert_eq!(
        record.location(),
        "http://download.gnome.org/sources/gnome-foo/*/"
    );
    assert_eq!(record.comparison().await.unwrap(), Comparison::Equal);
    assert_eq!(
        record.fetched_location(),
        Some("http://download.gnome.org/sources/gnome-foo/3.10/")
    );
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn unknown_package_fails_without_fetching() {
    let fetcher = Arc::new(StaticFetcher::new());
    let context = create_test_context(fetcher.clone(), create_test_index(&[]));
    let mut record =
        PackageRecord::new("ghost", "DEFAULT", "http://example.org/ghost/", context).unwrap();

    let result = record.comparison().await;

    assert!(matches!(
        result,
        Err(CheckError::PackagedVersionNotFound { name, repo }) if name == "ghost" && repo == "rawhide"
    ));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn listing_without_versions_is_reported() {
    let fetcher = Arc::new(
        StaticFetcher::new().with_page("http://example.org/cnucnu/", "nothing to see"),
    );
    let context = create_test_context(
        fetcher,
        create_test_index(&[("cnucnu", "0.1", "1.fc20")]),
    );
    let mut record =
        PackageRecord::new("cnucnu", "DEFAULT", "http://example.org/cnucnu/", context).unwrap();

    assert!(matches!(
        record.latest_upstream().await,
        Err(CheckError::NoUpstreamVersion { .. })
    ));
}

#[tokio::test]
async fn render_uses_computed_values() {
    let fetcher = Arc::new(
        StaticFetcher::new().with_page("http://example.org/cnucnu/", CNUCNU_LISTING),
    );
    let context = create_test_context(
        fetcher,
        create_test_index(&[("cnucnu", "0.1", "1.fc20")]),
    );
    let mut record =
        PackageRecord::new("cnucnu", "DEFAULT", "http://example.org/cnucnu/", context).unwrap();
    record.comparison().await.unwrap();

    let template = SummaryTemplate::new(
        "{{ name }}: {{ repo_version }} in {{ repo_name }}, {{ latest_upstream }} upstream",
    )
    .unwrap();

    let rendered = record.render(&template).unwrap();

    assert_eq!(rendered, "cnucnu: 0.1 in rawhide, 0.2 upstream");
}

#[tokio::test]
async fn http_fetcher_serves_record() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/releases/")
        .with_status(200)
        .with_body("<a href=\"tool-1.4.2.tar.bz2\">tool-1.4.2.tar.bz2</a>")
        .expect(1)
        .create_async()
        .await;

    let context = PackageContext::new(
        Arc::new(AliasTable::builtin()),
        Arc::new(HttpFetcher::new(Duration::from_secs(5), "upstream-check-test")),
        Arc::new(create_test_index(&[("tool", "1.4.1", "3.fc20")])),
    );
    let location = format!("{}/releases/", server.url());
    let mut record = PackageRecord::new("tool", "DEFAULT", &location, context).unwrap();

    assert_eq!(record.comparison().await.unwrap(), Comparison::UpstreamNewer);
    assert_eq!(record.latest_upstream().await.unwrap(), "1.4.2");
    mock.assert_async().await;
}
