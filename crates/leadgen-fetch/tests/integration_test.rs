use leadgen_core::AppConfig;
use leadgen_fetch::{FetchErrorKind, Fetcher, HostRateLimiter, PageFetcher, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_fetcher() -> Fetcher {
    let mut config = AppConfig::default();
    config.rate_limit.min_interval_ms = 0;
    config.fetch.timeout_secs = 5;

    let limiter = Arc::new(HostRateLimiter::from_config(&config.rate_limit));
    Fetcher::from_config(&config, limiter)
        .expect("build reqwest fetcher")
        .with_retry_policy(RetryPolicy {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            max_attempts: 3,
            network_max_attempts: 2,
        })
}

#[tokio::test]
async fn test_fetch_success_sends_browser_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/contact"))
        .and(header_exists("user-agent"))
        .and(header_exists("accept-language"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Acme Plumbing</title></html>"),
        )
        .mount(&mock_server)
        .await;

    let url = format!("{}/contact", mock_server.uri());
    let page = fast_fetcher().fetch(&url).await.expect("fetch should succeed");

    assert_eq!(page.attempts, 1);
    assert!(page.content.contains("Acme Plumbing"));
    assert_eq!(page.final_url, url);
}

#[tokio::test]
async fn test_fetch_follows_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
        .mount(&mock_server)
        .await;

    let page = fast_fetcher()
        .fetch(&format!("{}/old", mock_server.uri()))
        .await
        .expect("redirect should be followed");

    assert_eq!(page.content, "moved here");
    assert!(page.final_url.ends_with("/new"));
}

#[tokio::test]
async fn test_fetch_retries_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .mount(&mock_server)
        .await;

    let page = fast_fetcher()
        .fetch(&format!("{}/", mock_server.uri()))
        .await
        .expect("third attempt should succeed");

    assert_eq!(page.content, "finally");
    assert_eq!(page.attempts, 3);
}

#[tokio::test]
async fn test_fetch_not_found_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = fast_fetcher()
        .fetch(&format!("{}/gone", mock_server.uri()))
        .await
        .expect_err("404 must fail");

    assert_eq!(err.kind, FetchErrorKind::NotFound);
    assert_eq!(err.attempts, 1);
}

#[tokio::test]
async fn test_fetch_connection_refused_is_network_error() {
    // Bind then drop a listener so the port is known to be closed.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let err = fast_fetcher()
        .fetch(&format!("http://127.0.0.1:{port}/"))
        .await
        .expect_err("closed port must fail");

    assert_eq!(err.kind, FetchErrorKind::NetworkError);
    assert_eq!(err.attempts, 2);
}
