//! End-to-end tests of the execution loop against a mock driver.
//!
//! The driver is a wiremock server that answers each posted result with the
//! next command, so every test exercises the real HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use runner_loop::{
    register_builtins, ActionRegistry, Dispatcher, ExecutionLoop, HttpTransport, LoopConfig,
    RunnerError,
};
use runner_protocols::{Action, ActionContext, ActionError, ActionValue};

// ============================================================================
// Test Helpers
// ============================================================================

const DRIVER_PATH: &str = "/selenium-server/driver/";

/// Action failing with a verification message.
struct VerifyText;

#[async_trait]
impl Action for VerifyText {
    fn name(&self) -> &str {
        "verifyText"
    }

    async fn execute(
        &self,
        _ctx: &mut ActionContext<'_>,
        arg1: &str,
        arg2: &str,
    ) -> Result<ActionValue, ActionError> {
        Err(ActionError::failure(format!(
            "Actual value '{}' did not match '{}'",
            arg1, arg2
        )))
    }
}

fn fast_config() -> LoopConfig {
    LoopConfig {
        transport_retry: Duration::from_millis(20),
        retry_last_delay: Duration::from_millis(10),
        condition_poll: Duration::from_millis(5),
        default_timeout: Duration::from_secs(5),
        continue_run: false,
    }
}

fn runner_for(server: &MockServer, config: LoopConfig) -> ExecutionLoop {
    let url = Url::parse(&format!("{}{}", server.uri(), DRIVER_PATH)).unwrap();
    let transport = Arc::new(HttpTransport::new(url.clone(), Some(Duration::from_secs(5))).unwrap());

    let registry = Arc::new(ActionRegistry::new());
    register_builtins(&registry).unwrap();
    registry.register(Arc::new(VerifyText)).unwrap();

    ExecutionLoop::new(config, url, transport, Dispatcher::new(registry))
}

/// Answer a posted result with `response`.
async fn respond(server: &MockServer, posted: &str, response: &str) {
    Mock::given(method("POST"))
        .and(path(DRIVER_PATH))
        .and(body_string(posted))
        .respond_with(ResponseTemplate::new(200).set_body_string(response))
        .up_to_n_times(1)
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_run_over_http() {
    let server = MockServer::start().await;
    respond(&server, "postedData=START", "cmd=store&1=alice&2=user").await;
    respond(&server, "postedData=OK", "cmd=echo&1=hello+%24%7Buser%7D").await;
    respond(
        &server,
        "postedData=OK%2Chello+alice",
        "cmd=verifyText&1=a&2=b",
    )
    .await;
    respond(
        &server,
        "postedData=Actual+value+%27a%27+did+not+match+%27b%27",
        "|testComplete",
    )
    .await;

    let mut runner = runner_for(&server, fast_config());
    runner.run_until_complete().await.unwrap();

    let snapshot = runner.metrics().snapshot();
    assert_eq!(snapshot.commands_dispatched, 3);
    assert_eq!(snapshot.failures, 1);
    assert_eq!(snapshot.runs_completed, 1);
}

#[tokio::test]
async fn test_first_request_carries_start_flag() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(DRIVER_PATH))
        .and(query_param("seleniumStart", "true"))
        .and(query_param("localFrameAddress", "top"))
        .and(query_param("sessionId", "grid-7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("|testComplete"))
        .expect(1)
        .mount(&server)
        .await;

    let mut runner = runner_for(&server, fast_config()).with_session_id("grid-7");
    runner.run_until_complete().await.unwrap();
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    respond(&server, "postedData=START", "|testComplete").await;

    let mut runner = runner_for(&server, fast_config());
    runner.run_until_complete().await.unwrap();

    assert_eq!(runner.metrics().snapshot().transport_failures, 2);
}

#[tokio::test]
async fn test_wait_for_condition_over_http() {
    let server = MockServer::start().await;
    respond(&server, "postedData=START", "cmd=store&1=yes&2=ready").await;
    respond(
        &server,
        "postedData=OK",
        "cmd=waitForCondition&1=storedVars.ready+%3D%3D+%27yes%27&2=1000",
    )
    .await;

    let mut runner = runner_for(&server, fast_config());
    // Second "OK" (from the satisfied wait) is answered by the fallback below.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("|testComplete"))
        .mount(&server)
        .await;
    runner.run_until_complete().await.unwrap();

    assert_eq!(runner.metrics().snapshot().condition_timeouts, 0);
    assert_eq!(runner.metrics().snapshot().commands_dispatched, 2);
}

#[tokio::test]
async fn test_continuation_failure_aborts_over_http() {
    let server = MockServer::start().await;
    respond(&server, "postedData=OK", "cmd=verifyText&1=x&2=y").await;

    let config = LoopConfig {
        continue_run: true,
        ..fast_config()
    };
    let mut runner = runner_for(&server, config);
    let result = runner.run().await;

    assert!(matches!(result, Err(RunnerError::Aborted)));
    assert!(runner.session().is_aborted());
}
