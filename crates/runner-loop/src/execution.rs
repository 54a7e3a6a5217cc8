//! The command execution loop.
//!
//! A single task drives the state machine
//!
//! ```text
//! Idle -> Requesting -> Dispatching -> (AwaitingCondition) -> Reporting -> Requesting
//!                    \-> Complete -> Requesting
//! Reporting -> Aborted (failure in continuation mode)
//! ```
//!
//! At most one poll is outstanding. The loop suspends only on the
//! transport and on its own timers, and every timer races the
//! cancellation token.

use std::sync::Arc;
use std::time::Duration;

use runner_protocols::{
    ActionContext, Command, NoopPresenter, NullSurface, Outcome, Presenter, TargetSurface,
    VariableStore,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::codec::{self, Instruction};
use crate::condition::{ConditionWait, WaitStatus};
use crate::config::LoopConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{RunnerError, RunnerResult};
use crate::metrics::RunnerMetrics;
use crate::session::Session;
use crate::state::{LoopPhase, LoopState};
use crate::transport::{PollRequest, Transport};

/// Execution loop owning the session and the variable store.
pub struct ExecutionLoop {
    config: LoopConfig,
    session: Session,
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
    surface: Arc<dyn TargetSurface>,
    presenter: Arc<dyn Presenter>,
    variables: VariableStore,
    state: LoopState,
    metrics: Arc<RunnerMetrics>,
    cancel: CancellationToken,
    /// Next poll replays the previous body.
    replay: bool,
}

impl ExecutionLoop {
    /// Create a loop for the driver at `driver_url`.
    pub fn new(
        config: LoopConfig,
        driver_url: Url,
        transport: Arc<dyn Transport>,
        dispatcher: Dispatcher,
    ) -> Self {
        let session = Session::new(driver_url, config.continue_run, config.default_timeout);
        Self {
            config,
            session,
            transport,
            dispatcher,
            surface: Arc::new(NullSurface),
            presenter: Arc::new(NoopPresenter),
            variables: VariableStore::new(),
            state: LoopState::Idle,
            metrics: Arc::new(RunnerMetrics::new()),
            cancel: CancellationToken::new(),
            replay: false,
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn TargetSurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session.set_session_id(session_id);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RunnerMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    pub fn phase(&self) -> LoopPhase {
        self.state.phase()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn metrics(&self) -> &Arc<RunnerMetrics> {
        &self.metrics
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Run until the session aborts or the loop is cancelled.
    pub async fn run(&mut self) -> RunnerResult<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(RunnerError::Cancelled);
            }
            if self.step().await == LoopPhase::Aborted {
                return Err(RunnerError::Aborted);
            }
        }
    }

    /// Run until the driver marks the current run complete.
    pub async fn run_until_complete(&mut self) -> RunnerResult<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(RunnerError::Cancelled);
            }
            match self.step().await {
                LoopPhase::Complete => return Ok(()),
                LoopPhase::Aborted => return Err(RunnerError::Aborted),
                _ => {}
            }
        }
    }

    /// Perform one transition and return the new phase.
    pub async fn step(&mut self) -> LoopPhase {
        let state = std::mem::replace(&mut self.state, LoopState::Idle);
        let from = state.phase();

        let next = match state {
            LoopState::Idle => {
                self.metrics.mark_start();
                LoopState::Requesting
            }
            LoopState::Requesting => self.request().await,
            LoopState::Dispatching(command) => self.dispatch(command).await,
            LoopState::AwaitingCondition(wait) => self.await_condition(wait).await,
            LoopState::Reporting(outcome) => self.report(outcome),
            LoopState::Complete => {
                self.session.reset_for_next_run();
                LoopState::Requesting
            }
            LoopState::Aborted => LoopState::Aborted,
        };

        self.state = next;
        let to = self.state.phase();
        if from != to {
            tracing::debug!(from = %from, to = %to, "Loop transition");
        }
        to
    }

    // ========================================================================
    // States
    // ========================================================================

    async fn request(&mut self) -> LoopState {
        let replay = std::mem::take(&mut self.replay);
        let body = match (replay, self.session.last_posted()) {
            (true, Some(previous)) => previous.to_string(),
            _ => self.session.pending_result().to_string(),
        };

        let frame_address = self.surface.frame_address();
        let window_name = self.surface.window_name();
        let params = self
            .session
            .query_params(&body, &frame_address, window_name, replay);
        let request = PollRequest { body, params };

        self.metrics.record_poll();
        let response = tokio::select! {
            response = self.transport.poll(&request) => Some(response),
            _ = self.cancel.cancelled() => None,
        };
        let Some(response) = response else {
            self.replay = replay;
            return LoopState::Requesting;
        };
        self.session.mark_posted(request.body);

        let raw = match response {
            Ok(raw) => raw,
            Err(failure) => {
                tracing::warn!(
                    status = failure.status,
                    status_text = %failure.status_text,
                    "Driver request failed, retrying"
                );
                self.metrics.record_transport_failure();
                self.replay = replay;
                self.pause(self.config.transport_retry).await;
                return LoopState::Requesting;
            }
        };

        let decoded = match codec::decode(&raw) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable driver response, retrying");
                self.metrics.record_protocol_error();
                self.replay = replay;
                self.pause(self.config.transport_retry).await;
                return LoopState::Requesting;
            }
        };

        self.session.apply_directives(&decoded.directives);

        match decoded.instruction {
            Instruction::Execute(command) => LoopState::Dispatching(command),
            Instruction::RetryLast => {
                tracing::debug!("Driver asked for the last result again");
                self.metrics.record_retry_last();
                self.pause(self.config.retry_last_delay).await;
                self.replay = true;
                LoopState::Requesting
            }
            Instruction::Complete => {
                tracing::info!("Driver marked the run complete");
                self.metrics.record_run_complete();
                self.presenter.on_run_complete();
                LoopState::Complete
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> LoopState {
        self.presenter.on_command_started(&command);
        self.metrics.record_dispatch();

        let outcome = {
            let mut ctx = ActionContext {
                variables: &mut self.variables,
                default_timeout: self.session.default_timeout_mut(),
                surface: self.surface.as_ref(),
                presenter: self.presenter.as_ref(),
            };
            self.dispatcher.dispatch(&command, &mut ctx).await
        };

        match outcome {
            Outcome::DeferredCompletion(deferral) => {
                let wait = ConditionWait::from_deferral(&deferral, self.session.default_timeout());
                tracing::debug!(
                    command = %command.name,
                    timeout_ms = wait.timeout().as_millis() as u64,
                    "Awaiting completion condition"
                );
                LoopState::AwaitingCondition(wait)
            }
            outcome => LoopState::Reporting(outcome),
        }
    }

    async fn await_condition(&mut self, wait: ConditionWait) -> LoopState {
        let status = wait.check(&self.variables, self.surface.as_ref());
        if status == WaitStatus::TimedOut {
            self.metrics.record_condition_timeout();
        }
        match wait.resolve(status) {
            Some(outcome) => LoopState::Reporting(outcome),
            None => {
                self.pause(self.config.condition_poll).await;
                LoopState::AwaitingCondition(wait)
            }
        }
    }

    fn report(&mut self, outcome: Outcome) -> LoopState {
        self.presenter.on_command_complete(&outcome);
        match &outcome {
            Outcome::Failed(_) => self.metrics.record_failure(),
            Outcome::Errored(message) => {
                self.metrics.record_error();
                self.presenter.on_error(message);
            }
            _ => {}
        }

        if outcome.is_failure() && self.session.is_continuation() {
            tracing::error!(outcome = %outcome, "Failure in continuation mode, aborting");
            self.session.abort();
            self.presenter.on_aborted();
            return LoopState::Aborted;
        }

        let result = codec::encode(&outcome).unwrap_or_else(|e| format!("ERROR: {}", e));
        self.session.set_pending_result(result);
        LoopState::Requesting
    }

    /// Sleep for `duration` unless cancelled first.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
