//! Reddit source tests against a mock HTTP server.

use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shortcast_models::RedditConfig;
use shortcast_timeline::{ContentSource, TimelineError};
use shortcast_worker::{RedditSource, WorkerError};

fn source_for(server: &MockServer) -> RedditSource {
    RedditSource::new(&RedditConfig {
        base_url: server.uri(),
        user_agent: "shortcast-test/1.0".to_string(),
        ..RedditConfig::default()
    })
    .unwrap()
}

fn thread_body() -> serde_json::Value {
    json!([
        {"kind": "Listing", "data": {"children": [
            {"kind": "t3", "data": {"id": "abc123", "subreddit": "AskReddit", "title": "What happened?"}}
        ]}},
        {"kind": "Listing", "data": {"children": [
            {"kind": "t1", "data": {"author": "alice", "body": "It rained.", "score": 42}},
            {"kind": "t1", "data": {"author": "bob", "body": "[removed]", "score": 3}},
            {"kind": "t1", "data": {"author": "carol", "body": "Then it stopped.", "score": 17}}
        ]}}
    ])
}

#[tokio::test]
async fn test_fetch_thread() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/comments/abc123.json"))
        .and(query_param("limit", "20"))
        .and(query_param("sort", "top"))
        .and(header("user-agent", "shortcast-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thread_body()))
        .expect(1)
        .mount(&server)
        .await;

    let thread = assert_ok!(source_for(&server).fetch_thread("abc123", 20).await);

    assert_eq!(thread.title, "What happened?");
    assert_eq!(thread.subreddit, "AskReddit");
    assert_eq!(thread.comments.len(), 2);
    assert_eq!(thread.comments[1].body, "Then it stopped.");
}

#[tokio::test]
async fn test_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = assert_err!(source_for(&server).fetch_thread("zzz999", 10).await);
    assert!(matches!(err, WorkerError::ThreadNotFound(ref id) if id == "zzz999"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = assert_err!(source_for(&server).fetch_thread("abc123", 10).await);
    assert!(matches!(err, WorkerError::ContentFetch(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_content_source_maps_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;

    let source = source_for(&server);
    let err = ContentSource::fetch(&source, "abc123", 10).await.unwrap_err();
    assert!(matches!(err, TimelineError::ContentUnavailable(_)));
}
