//! End-to-end checker behavior: cache write-through, fallbacks, dedupe

use crate::test_client;
use link_vigil::cache::{CacheTtl, ResultCache, SqliteCache};
use link_vigil::config::Config;
use link_vigil::fallback::FallbackUrl;
use link_vigil::probe::{CheckOptions, Outcome};
use link_vigil::url::IgnoreRules;
use link_vigil::Checker;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_options() -> CheckOptions {
    CheckOptions {
        retry_backoff_unit: Duration::from_millis(1),
        ignore: IgnoreRules::none(),
        ..CheckOptions::default()
    }
}

fn memory_cache() -> Arc<dyn ResultCache> {
    Arc::new(SqliteCache::open_in_memory(CacheTtl::default()).unwrap())
}

fn ok_page() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw("<p id=\"here\">hi</p>", "text/html")
}

#[tokio::test]
async fn test_cached_success_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ok_page())
        .expect(1)
        .mount(&server)
        .await;

    let checker = Checker::new(test_options(), test_client(), Some(memory_cache()));
    let target = format!("{}/page", server.uri());

    let first = checker.check_url(&target).await;
    let second = checker.check_url(&target).await;
    assert!(first.is_alive());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_errors_are_cached_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let checker = Checker::new(test_options(), test_client(), Some(memory_cache()));
    let target = format!("{}/gone", server.uri());

    assert_eq!(checker.check_url(&target).await.kind(), "response");
    assert_eq!(checker.check_url(&target).await.kind(), "response");
}

#[tokio::test]
async fn test_duplicates_are_probed_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ok_page())
        .expect(1)
        .mount(&server)
        .await;

    let checker = Checker::new(test_options(), test_client(), None);
    let target = format!("{}/page", server.uri());
    let statuses = checker
        .check_urls(&[target.clone(), target.clone(), "mailto:x@y.z".to_string()])
        .await;

    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0].status, statuses[1].status);
    assert_eq!(statuses[2].status, Outcome::Ignored);
}

#[tokio::test]
async fn test_fragment_dropped_when_anchors_are_not_checked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ok_page())
        .expect(1)
        .mount(&server)
        .await;

    let options = CheckOptions {
        check_anchor: false,
        ..test_options()
    };
    let checker = Checker::new(options, test_client(), Some(memory_cache()));

    let first = checker.check_url(&format!("{}/page#one", server.uri())).await;
    let second = checker.check_url(&format!("{}/page#two", server.uri())).await;
    assert_eq!(first, Outcome::success(format!("{}/page", server.uri())));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_localhost_is_ignored_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok_page())
        .expect(0)
        .mount(&server)
        .await;

    let checker = Checker::new(CheckOptions::default(), test_client(), None);
    let outcome = checker.check_url(&format!("{}/page", server.uri())).await;
    assert_eq!(outcome, Outcome::Ignored);
}

#[tokio::test]
async fn test_successful_fallbacks_replace_the_original() {
    let server = MockServer::start().await;
    for name in ["/registry/react", "/registry/vue"] {
        Mock::given(method("GET"))
            .and(path(name))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/compare"))
        .respond_with(ResponseTemplate::new(403))
        .expect(0)
        .mount(&server)
        .await;

    let base = server.uri();
    let registry = base.clone();
    let checker = Checker::new(test_options(), test_client(), None).with_fallbacks(move |url| {
        if url.path() != "/compare" {
            return Vec::new();
        }
        ["react", "vue"]
            .iter()
            .map(|name| FallbackUrl {
                url: format!("{}/registry/{}", registry, name),
                headers: vec![("accept".to_string(), "application/json".to_string())],
            })
            .collect()
    });

    let outcome = checker.check_url(&format!("{}/compare", base)).await;
    assert_eq!(
        outcome,
        Outcome::Fallback {
            url: format!("{}/compare", base),
            fallbacks: vec![format!("{}/registry/react", base), format!("{}/registry/vue", base)],
        }
    );
}

#[tokio::test]
async fn test_failed_fallback_probes_the_original() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/registry/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/package"))
        .respond_with(ok_page())
        .expect(1)
        .mount(&server)
        .await;

    let registry = server.uri();
    let checker = Checker::new(test_options(), test_client(), None).with_fallbacks(move |url| {
        if url.path() == "/package" {
            vec![FallbackUrl {
                url: format!("{}/registry/missing", registry),
                headers: Vec::new(),
            }]
        } else {
            Vec::new()
        }
    });

    let outcome = checker.check_url(&format!("{}/package", server.uri())).await;
    assert_eq!(outcome, Outcome::success(format!("{}/package", server.uri())));
}

#[tokio::test]
async fn test_from_config_persists_results_across_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ok_page())
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.checker.ignore_localhost = false;
    config.network.use_env_proxy = false;
    config.cache.path = dir.path().join("nested/cache.db").display().to_string();

    let target = format!("{}/page#here", server.uri());
    for _ in 0..2 {
        let checker = Checker::from_config(&config).unwrap();
        let statuses = checker.check_urls(&[target.clone()]).await;
        assert!(statuses[0].status.is_alive());
    }
}
