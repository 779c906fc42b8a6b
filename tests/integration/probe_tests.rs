//! Prober behavior against a mock server

use crate::test_client;
use link_vigil::anchor::AnchorAllowlist;
use link_vigil::probe::{CheckOptions, Outcome, ProbeError, Prober};
use link_vigil::url::IgnoreRules;
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Options tuned for fast tests: tiny backoff, short timeout
fn test_options() -> CheckOptions {
    CheckOptions {
        timeout: Duration::from_millis(1000),
        retry_backoff_unit: Duration::from_millis(1),
        ignore: IgnoreRules::none(),
        ..CheckOptions::default()
    }
}

fn prober(options: CheckOptions) -> Prober {
    Prober::new(test_client(), Arc::new(options))
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

fn plain(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/plain")
}

fn refresh_to(target: &str) -> ResponseTemplate {
    html(&format!(
        r#"<html><head><meta http-equiv="refresh" content="0; url={}"></head></html>"#,
        target
    ))
}

fn redirect_to(status: u16, target: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).insert_header("Location", target)
}

fn url(server: &MockServer, rest: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), rest)).unwrap()
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_plain_text_succeeds_regardless_of_anchor() {
    let server = MockServer::start().await;
    mount(&server, "/notes.txt", plain("no ids here")).await;

    let target = url(&server, "/notes.txt#missing");
    for check_anchor in [true, false] {
        let options = CheckOptions {
            check_anchor,
            ..test_options()
        };
        let outcome = prober(options).probe(&target, None).await;
        assert_eq!(outcome, Outcome::success(target.as_str()));
    }
}

#[tokio::test]
async fn test_existing_anchor() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html(r#"<h2 id="section-2">Two</h2>"#)).await;

    let target = url(&server, "/doc#section-2");
    let outcome = prober(test_options()).probe(&target, None).await;
    assert_eq!(outcome, Outcome::success(target.as_str()));
}

#[tokio::test]
async fn test_missing_anchor() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html(r#"<h2 id="section-2">Two</h2>"#)).await;

    let target = url(&server, "/doc#missing");
    let outcome = prober(test_options()).probe(&target, None).await;
    assert_eq!(
        outcome,
        Outcome::error(
            target.as_str(),
            ProbeError::MissingAnchor {
                url: target.to_string(),
                fragment: "missing".to_string(),
            }
        )
    );
}

#[tokio::test]
async fn test_anchor_comparison_is_case_sensitive() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html(r#"<h2 id="Intro">Intro</h2>"#)).await;

    let outcome = prober(test_options())
        .probe(&url(&server, "/doc#intro"), None)
        .await;
    assert_eq!(outcome.kind(), "missingAnchor");
}

#[tokio::test]
async fn test_percent_encoded_anchor() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html(r#"<h2 id="café">Café</h2>"#)).await;

    let outcome = prober(test_options())
        .probe(&url(&server, "/doc#café"), None)
        .await;
    assert!(matches!(outcome, Outcome::Success { .. }), "{:?}", outcome);
}

#[tokio::test]
async fn test_anchor_check_disabled() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html("<p>nothing</p>")).await;

    let options = CheckOptions {
        check_anchor: false,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/doc#missing"), None).await;
    assert!(outcome.is_alive());
}

#[tokio::test]
async fn test_allowlisted_anchor_skips_lookup() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html("<p>nothing</p>")).await;

    let options = CheckOptions {
        anchor_allowlist: AnchorAllowlist::from_patterns(&[("/doc$", "^L\\d+$")]).unwrap(),
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/doc#L42"), None).await;
    assert!(outcome.is_alive());
}

#[tokio::test]
async fn test_text_fragment_allowed_by_default() {
    let server = MockServer::start().await;
    mount(&server, "/doc", html("<p>hello</p>")).await;

    let outcome = prober(test_options())
        .probe(&url(&server, "/doc#:~:text=hello"), None)
        .await;
    assert!(outcome.is_alive());
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let server = MockServer::start().await;
    mount(&server, "/old", redirect_to(301, "/new")).await;
    mount(&server, "/new", plain("moved here")).await;

    let outcome = prober(test_options()).probe(&url(&server, "/old"), None).await;
    assert_eq!(outcome, Outcome::success(url(&server, "/new").as_str()));
}

#[tokio::test]
async fn test_redirect_carries_fragment() {
    let server = MockServer::start().await;
    mount(&server, "/old", redirect_to(302, "/doc")).await;
    mount(&server, "/doc", html(r#"<div id="usage"></div>"#)).await;

    let prober = prober(test_options());
    let found = prober.probe(&url(&server, "/old#usage"), None).await;
    assert_eq!(found, Outcome::success(url(&server, "/doc#usage").as_str()));

    let missing = prober.probe(&url(&server, "/old#nope"), None).await;
    match missing {
        Outcome::Error {
            error: ProbeError::MissingAnchor { url: final_url, fragment },
            ..
        } => {
            assert_eq!(final_url, url(&server, "/doc#nope").to_string());
            assert_eq!(fragment, "nope");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_loop_hits_max_redirects() {
    let server = MockServer::start().await;
    mount(&server, "/loop", redirect_to(302, "/loop")).await;

    let options = CheckOptions {
        max_redirects: 3,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/loop"), None).await;
    match outcome {
        Outcome::Error {
            error: ProbeError::MaxRedirect { redirects, max_redirects },
            ..
        } => {
            assert_eq!(redirects, 4);
            assert_eq!(max_redirects, 3);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_without_location_is_a_response_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/nowhere"))
        .respond_with(ResponseTemplate::new(302))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = prober(test_options()).probe(&url(&server, "/nowhere"), None).await;
    assert_eq!(outcome.kind(), "response");
}

#[tokio::test]
async fn test_meta_refresh_is_followed() {
    let server = MockServer::start().await;
    mount(&server, "/x", refresh_to("/next")).await;
    mount(&server, "/next", plain("arrived")).await;

    let outcome = prober(test_options()).probe(&url(&server, "/x"), None).await;
    assert_eq!(outcome, Outcome::success(url(&server, "/next").as_str()));
}

#[tokio::test]
async fn test_refresh_loop_is_bounded() {
    let server = MockServer::start().await;
    mount(&server, "/spin", refresh_to("/spin")).await;

    let options = CheckOptions {
        max_redirects: 2,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/spin"), None).await;
    assert!(matches!(
        outcome,
        Outcome::Error {
            error: ProbeError::MaxRedirect { redirects: 3, max_redirects: 2 },
            ..
        }
    ));
}

/// One redirect followed by two refreshes
async fn mixed_chain(server: &MockServer) {
    mount(server, "/r1", redirect_to(302, "/p1")).await;
    mount(server, "/p1", refresh_to("/p2")).await;
    mount(server, "/p2", refresh_to("/done")).await;
    mount(server, "/done", plain("done")).await;
}

#[tokio::test]
async fn test_refreshes_counted_separately_by_default() {
    let server = MockServer::start().await;
    mixed_chain(&server).await;

    let options = CheckOptions {
        max_redirects: 2,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/r1"), None).await;
    assert_eq!(outcome, Outcome::success(url(&server, "/done").as_str()));
}

#[tokio::test]
async fn test_refreshes_counted_as_redirects() {
    let server = MockServer::start().await;
    mixed_chain(&server).await;

    let options = CheckOptions {
        max_redirects: 2,
        count_refresh_as_redirect: true,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/r1"), None).await;
    assert!(matches!(
        outcome,
        Outcome::Error {
            error: ProbeError::MaxRedirect { redirects: 3, max_redirects: 2 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_malformed_refresh_target() {
    let server = MockServer::start().await;
    mount(&server, "/bad", refresh_to("http://[oops")).await;

    let page = url(&server, "/bad");
    let outcome = prober(test_options()).probe(&page, None).await;
    assert_eq!(
        outcome,
        Outcome::error(
            page.as_str(),
            ProbeError::SharedDeclarativeRefresh {
                url: "http://[oops".to_string(),
                from: page.to_string(),
            }
        )
    );
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let options = CheckOptions {
        max_retries: 3,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/gone"), None).await;
    assert!(matches!(
        outcome,
        Outcome::Error {
            error: ProbeError::Response { status: 404 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_server_errors_are_retried_up_to_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let options = CheckOptions {
        max_retries: 2,
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/flaky"), None).await;
    assert!(matches!(
        outcome,
        Outcome::Error {
            error: ProbeError::Response { status: 503 },
            ..
        }
    ));
}

#[tokio::test]
async fn test_retries_wait_one_then_eight_units() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let unit = Duration::from_millis(25);
    let options = CheckOptions {
        max_retries: 2,
        retry_backoff_unit: unit,
        ..test_options()
    };
    let start = Instant::now();
    let outcome = prober(options).probe(&url(&server, "/busy"), None).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.kind(), "response");
    assert!(elapsed >= unit * 9, "{:?}", elapsed);
    assert!(elapsed < Duration::from_secs(5), "{:?}", elapsed);
}

#[tokio::test]
async fn test_retry_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount(&server, "/flaky", plain("ok now")).await;

    let outcome = prober(test_options()).probe(&url(&server, "/flaky"), None).await;
    assert!(outcome.is_alive(), "{:?}", outcome);
}

#[tokio::test]
async fn test_timeout_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(plain("late").set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let options = CheckOptions {
        timeout: Duration::from_millis(100),
        ..test_options()
    };
    let outcome = prober(options).probe(&url(&server, "/slow"), None).await;
    assert_eq!(outcome.kind(), "fetch");
}

#[tokio::test]
async fn test_connection_refused_is_a_fetch_error() {
    let target = Url::parse("http://127.0.0.1:1/").unwrap();
    let outcome = prober(test_options()).probe(&target, None).await;
    assert!(matches!(
        outcome,
        Outcome::Error {
            error: ProbeError::Fetch { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_allowed_status_codes_by_host() {
    let server = MockServer::start().await;
    mount(&server, "/private", ResponseTemplate::new(403)).await;

    let host = url(&server, "/").host_str().unwrap().to_string();
    let mut by_host = HashMap::new();
    by_host.insert(host, HashSet::from([403]));
    let options = CheckOptions {
        allowed_status_codes_by_host: Some(by_host),
        ..test_options()
    };

    let outcome = prober(options).probe(&url(&server, "/private"), None).await;
    assert!(outcome.is_alive(), "{:?}", outcome);
}

#[tokio::test]
async fn test_extra_headers_only_on_first_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .and(header("x-fallback", "1"))
        .respond_with(redirect_to(302, "/end"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/end"))
        .and(header("x-fallback", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    mount(&server, "/end", plain("clean")).await;

    let mut headers = HeaderMap::new();
    headers.insert("x-fallback", HeaderValue::from_static("1"));
    let outcome = prober(test_options())
        .probe(&url(&server, "/start"), Some(headers))
        .await;
    assert_eq!(outcome, Outcome::success(url(&server, "/end").as_str()));
}

#[tokio::test]
async fn test_pacing_spaces_requests_to_one_host() {
    let server = MockServer::start().await;
    mount(&server, "/a", plain("a")).await;
    mount(&server, "/b", plain("b")).await;

    let options = CheckOptions {
        rate_limit_per_domain: Some(Duration::from_millis(300)),
        ..test_options()
    };
    let prober = prober(options);
    let url_a = url(&server, "/a");
    let url_b = url(&server, "/b");
    let begin = Instant::now();
    let (a, b) = tokio::join!(
        prober.probe(&url_a, None),
        prober.probe(&url_b, None)
    );

    assert!(a.is_alive() && b.is_alive());
    assert!(begin.elapsed() >= Duration::from_millis(300));
}
