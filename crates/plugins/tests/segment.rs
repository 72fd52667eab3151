//! Mock HTTP server tests for `SegmentPlugin::post_process()`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentry_plugins::segment::rate_limit_key;
use sentry_plugins::{
    ConfigStore, ErrorEvent, EventUser, FixedWindowRateLimiter, MemoryConfigStore, NoopRateLimiter,
    Plugin, PluginError, Project, RateLimiter, SegmentPlugin,
};

const WRITE_KEY: &str = "test-write-key";

/// Limiter that records every check and answers with a fixed verdict.
#[derive(Default)]
struct RecordingLimiter {
    limited: bool,
    checks: Mutex<Vec<(String, u32, Duration)>>,
}

#[async_trait]
impl RateLimiter for RecordingLimiter {
    async fn is_limited(&self, key: &str, limit: u32, window: Duration) -> bool {
        self.checks
            .lock()
            .unwrap()
            .push((key.to_string(), limit, window));
        self.limited
    }
}

fn project() -> Project {
    Project {
        id: 1,
        name: "foo Bar".to_string(),
        slug: "bar".to_string(),
        organization_slug: "baz".to_string(),
    }
}

fn event(user_id: Option<&str>) -> ErrorEvent {
    ErrorEvent {
        event_id: "ev-1".to_string(),
        group_id: 1,
        timestamp: chrono::Utc.with_ymd_and_hms(2016, 3, 1, 12, 0, 0).unwrap(),
        user: user_id.map(|id| EventUser {
            id: Some(id.to_string()),
        }),
        culprit: Some("foo.bar".to_string()),
        message: "Hello world".to_string(),
        project: project(),
        tags: vec![],
    }
}

fn store_with_write_key() -> Arc<MemoryConfigStore> {
    let store = Arc::new(MemoryConfigStore::new());
    store.set_option("segment", "write_key", WRITE_KEY, &project());
    store
}

fn plugin(
    server: &MockServer,
    store: Arc<dyn ConfigStore>,
    limiter: Arc<dyn RateLimiter>,
) -> SegmentPlugin {
    SegmentPlugin::new(
        format!("{}/v1/track", server.uri()),
        reqwest::Client::new(),
        store,
        limiter,
    )
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[tokio::test]
async fn forwards_identified_event() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/track"))
        .and(basic_auth(WRITE_KEY, ""))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = plugin(&server, store_with_write_key(), Arc::new(NoopRateLimiter));
    plugin.post_process(&event(Some("user-1"))).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();

    assert_eq!(
        body,
        serde_json::json!({
            "userId": "user-1",
            "event": "Error Captured",
            "properties": { "eventId": "ev-1" },
            "timestamp": "2016-03-01T12:00:00.000000Z",
            "integration": {
                "name": "sentry",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    );
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn skips_anonymous_event() {
    let server = MockServer::start().await;
    let limiter = Arc::new(RecordingLimiter::default());

    let plugin = plugin(&server, store_with_write_key(), limiter.clone());
    plugin.post_process(&event(None)).await.unwrap();
    plugin.post_process(&event(Some(""))).await.unwrap();

    assert_eq!(request_count(&server).await, 0);
    assert!(limiter.checks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn skips_without_write_key() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryConfigStore::new());
    store.set_option("segment", "write_key", "  ", &project());

    let plugin = plugin(&server, store, Arc::new(NoopRateLimiter));
    assert!(!plugin.is_configured(&project()));

    plugin.post_process(&event(Some("user-1"))).await.unwrap();

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn drops_rate_limited_event() {
    let server = MockServer::start().await;
    let limiter = Arc::new(RecordingLimiter {
        limited: true,
        ..RecordingLimiter::default()
    });

    let plugin = plugin(&server, store_with_write_key(), limiter.clone());
    plugin.post_process(&event(Some("user-1"))).await.unwrap();

    assert_eq!(request_count(&server).await, 0);

    let checks = limiter.checks.lock().unwrap();
    assert_eq!(
        *checks,
        vec![(rate_limit_key(WRITE_KEY), 50, Duration::from_secs(1))]
    );
    assert!(!checks[0].0.contains(WRITE_KEY));
}

#[tokio::test]
async fn non_success_status_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/track"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = plugin(&server, store_with_write_key(), Arc::new(NoopRateLimiter));
    assert!(plugin.post_process(&event(Some("user-1"))).await.is_ok());
}

#[tokio::test]
async fn transport_failure_propagates() {
    // Nothing listens on port 1.
    let plugin = SegmentPlugin::new(
        "http://127.0.0.1:1/v1/track",
        reqwest::Client::new(),
        store_with_write_key(),
        Arc::new(NoopRateLimiter),
    );

    let result = plugin.post_process(&event(Some("user-1"))).await;
    assert!(matches!(result, Err(PluginError::Http(_))));
}

#[tokio::test]
async fn write_key_is_sent_as_stored() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryConfigStore::new());
    store.set_option("segment", "write_key", " key ", &project());
    let limiter = Arc::new(RecordingLimiter::default());

    Mock::given(method("POST"))
        .and(path("/v1/track"))
        .and(basic_auth(" key ", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = plugin(&server, store, limiter.clone());
    assert!(plugin.is_configured(&project()));

    plugin.post_process(&event(Some("user-1"))).await.unwrap();

    assert_eq!(request_count(&server).await, 1);
    assert_eq!(limiter.checks.lock().unwrap()[0].0, rate_limit_key(" key "));
}

#[tokio::test]
async fn burst_is_capped_per_window() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/track"))
        .respond_with(ResponseTemplate::new(200))
        .expect(50)
        .mount(&server)
        .await;

    let plugin = plugin(
        &server,
        store_with_write_key(),
        Arc::new(FixedWindowRateLimiter::new()),
    );
    for _ in 0..51 {
        plugin.post_process(&event(Some("user-1"))).await.unwrap();
    }

    assert_eq!(request_count(&server).await, 50);
}
