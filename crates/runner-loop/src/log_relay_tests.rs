use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use runner_protocols::Presenter;
use tracing_subscriber::layer::SubscriberExt;
use url::Url;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::error::TransportFailure;
use crate::presenter::LoggingPresenter;
use crate::transport::HttpTransport;

/// Transport recording every request; optionally logs while sending.
#[derive(Default)]
struct RecordingTransport {
    requests: Mutex<Vec<PollRequest>>,
    log_while_sending: bool,
}

impl RecordingTransport {
    fn bodies(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.body.clone())
            .collect()
    }

    async fn wait_for(&self, count: usize) {
        for _ in 0..200 {
            if self.requests.lock().unwrap().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn poll(&self, request: &PollRequest) -> Result<String, TransportFailure> {
        if self.log_while_sending {
            tracing::warn!(target: "runner_loop::transport", "Sending relayed log");
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(String::new())
    }
}

/// Transport whose requests never finish.
struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn poll(&self, _request: &PollRequest) -> Result<String, TransportFailure> {
        std::future::pending().await
    }
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_log_message_flattens_newlines() {
    assert_eq!(
        log_message(LogLevel::Warn, "line one\nline two\r\n"),
        "logLevel=warn:line one line two  \n"
    );
    assert_eq!(log_message(LogLevel::Debug, "ok"), "logLevel=debug:ok\n");
}

#[test]
fn test_log_level_mapping() {
    assert_eq!(log_level(&Level::ERROR), LogLevel::Error);
    assert_eq!(log_level(&Level::WARN), LogLevel::Warn);
    assert_eq!(log_level(&Level::INFO), LogLevel::Info);
    assert_eq!(log_level(&Level::DEBUG), LogLevel::Debug);
    assert_eq!(log_level(&Level::TRACE), LogLevel::Debug);
}

#[test]
fn test_relayed_targets() {
    assert!(is_relayed_target("runner_loop"));
    assert!(is_relayed_target("runner_loop::execution"));
    assert!(is_relayed_target("remote_runner"));
    assert!(!is_relayed_target("runner_loopback"));
    assert!(!is_relayed_target("hyper::client::pool"));
    assert!(!is_relayed_target("reqwest::connect"));
}

// ============================================================================
// Relay
// ============================================================================

#[tokio::test]
async fn test_relay_posts_log_request_to_driver() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/selenium-server/driver/"))
        .and(query_param("logging", "true"))
        .and(query_param("sessionId", "s1"))
        .and(body_string("postedData=logLevel%3Dwarn%3Aline+one+line+two%0A"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/selenium-server/driver/", server.uri())).unwrap();
    let transport = HttpTransport::new(url, Some(Duration::from_secs(5))).unwrap();
    let relay = LogRelay::spawn(Arc::new(transport), Some("s1".to_string()));

    assert!(relay.relay(LogLevel::Warn, "line one\nline two"));

    for _ in 0..200 {
        if server.received_requests().await.is_some_and(|r| !r.is_empty()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    server.verify().await;
}

#[tokio::test]
async fn test_relay_request_params() {
    let transport = Arc::new(RecordingTransport::default());
    let relay = LogRelay::spawn(transport.clone(), None);

    relay.relay(LogLevel::Info, "hello");
    transport.wait_for(1).await;

    let request = transport.requests.lock().unwrap()[0].clone();
    let keys: Vec<&str> = request.params.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec![params::LOGGING, params::UNIQUE_ID, params::CACHE_BUSTER]);
    assert_eq!(request.params[1].1, client_id());
}

#[tokio::test]
async fn test_relay_drops_messages_below_threshold() {
    let transport = Arc::new(RecordingTransport::default());
    let relay = LogRelay::spawn(transport.clone(), None);
    assert_eq!(relay.threshold(), LogLevel::Debug);

    relay.set_threshold(LogLevel::Warn);
    assert!(!relay.relay(LogLevel::Info, "quiet"));
    assert!(relay.relay(LogLevel::Error, "boom"));
    transport.wait_for(1).await;

    assert_eq!(transport.bodies(), vec!["logLevel=error:boom\n"]);
}

#[tokio::test]
async fn test_full_queue_drops_without_blocking() {
    let relay = LogRelay::spawn(Arc::new(StalledTransport), None);

    let queued = (0..RELAY_CAPACITY + 50)
        .filter(|i| relay.relay(LogLevel::Info, &format!("event {}", i)))
        .count();

    assert!(queued <= RELAY_CAPACITY + 1);
    assert!(queued < RELAY_CAPACITY + 50);
}

// ============================================================================
// Layer
// ============================================================================

#[tokio::test]
async fn test_layer_relays_runner_events_only() {
    let transport = Arc::new(RecordingTransport::default());
    let relay = LogRelay::spawn(transport.clone(), None);
    let subscriber = tracing_subscriber::registry().with(relay.layer());
    let _guard = tracing::subscriber::set_default(subscriber);

    tracing::info!(target: "hyper::client", "connected");
    tracing::warn!(target: "runner_loop::execution", attempt = 2, "Driver request failed");
    transport.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        transport.bodies(),
        vec!["logLevel=warn:Driver request failed attempt=2\n"]
    );
}

#[tokio::test]
async fn test_layer_skips_events_from_relay_task() {
    let transport = Arc::new(RecordingTransport {
        log_while_sending: true,
        ..Default::default()
    });
    let relay = LogRelay::spawn(transport.clone(), None);
    let subscriber = tracing_subscriber::registry().with(relay.layer());
    let _guard = tracing::subscriber::set_default(subscriber);

    tracing::error!(target: "runner_loop::execution", "Run aborted");
    transport.wait_for(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(transport.bodies(), vec!["logLevel=error:Run aborted\n"]);
}

#[tokio::test]
async fn test_set_context_threshold_reaches_relay() {
    let transport = Arc::new(RecordingTransport::default());
    let relay = LogRelay::spawn(transport, None);
    let presenter = LoggingPresenter::new().with_relay(relay.clone());

    presenter.on_context("checkout", Some(LogLevel::Error));
    assert_eq!(relay.threshold(), LogLevel::Error);

    presenter.on_context("payment", None);
    assert_eq!(relay.threshold(), LogLevel::Error);
}
