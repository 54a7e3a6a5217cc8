//! Driver session state.
//!
//! The session is owned by the execution loop. It carries everything that
//! must survive from one poll to the next: identifiers, the result to post,
//! the previous body for replays, and the bindings set by directives.

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::OnceCell;
use url::Url;

use crate::codec::{Directive, OK, START};

/// Client identifier, generated once per process.
static CLIENT_ID: OnceCell<String> = OnceCell::new();

/// Stable identifier of this client for the lifetime of the process.
pub fn client_id() -> &'static str {
    CLIENT_ID.get_or_init(|| format!("sel_{}", uuid::Uuid::new_v4().simple()))
}

/// Query parameter names understood by the driver.
pub mod params {
    pub const START: &str = "seleniumStart";
    pub const RETRY: &str = "retry";
    pub const LOGGING: &str = "logging";
    pub const FRAME_ADDRESS: &str = "localFrameAddress";
    pub const WINDOW_NAME: &str = "seleniumWindowName";
    pub const UNIQUE_ID: &str = "uniqueId";
    pub const SESSION_ID: &str = "sessionId";
    pub const CACHE_BUSTER: &str = "counterToMakeURsUniqueAndSoStopPageCachingInTheBrowser";
}

/// State of one driver session.
#[derive(Debug)]
pub struct Session {
    driver_url: Url,
    session_id: Option<String>,
    aborted: bool,
    pending_result: String,
    last_posted: Option<String>,
    continuation: bool,
    window_name: Option<String>,
    bindings: HashMap<String, String>,
    default_timeout: Duration,
    last_counter: i64,
}

impl Session {
    /// Create a session. In continuation mode the first post is `OK`
    /// instead of `START`.
    pub fn new(driver_url: Url, continuation: bool, default_timeout: Duration) -> Self {
        let pending_result = if continuation { OK } else { START };
        Self {
            driver_url,
            session_id: None,
            aborted: false,
            pending_result: pending_result.to_string(),
            last_posted: None,
            continuation,
            window_name: None,
            bindings: HashMap::new(),
            default_timeout,
            last_counter: 0,
        }
    }

    /// Attach a known session identifier at construction time.
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn driver_url(&self) -> &Url {
        &self.driver_url
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Set the session identifier. Returns `false` when one is already set.
    pub fn set_session_id(&mut self, id: impl Into<String>) -> bool {
        if self.session_id.is_some() {
            return false;
        }
        self.session_id = Some(id.into());
        true
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Mark the session aborted. There is no way back.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    /// Result to post on the next request.
    pub fn pending_result(&self) -> &str {
        &self.pending_result
    }

    pub fn set_pending_result(&mut self, result: impl Into<String>) {
        self.pending_result = result.into();
    }

    /// Remember the body just posted, for `retryLast`.
    pub fn mark_posted(&mut self, body: impl Into<String>) {
        self.last_posted = Some(body.into());
    }

    pub fn last_posted(&self) -> Option<&str> {
        self.last_posted.as_deref()
    }

    pub fn window_name(&self) -> Option<&str> {
        self.window_name.as_deref()
    }

    pub fn binding(&self, key: &str) -> Option<&str> {
        self.bindings.get(key).map(String::as_str)
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn default_timeout_mut(&mut self) -> &mut Duration {
        &mut self.default_timeout
    }

    /// Apply the directives that arrived with a command.
    pub fn apply_directives(&mut self, directives: &[Directive]) {
        for directive in directives {
            match directive {
                Directive::WindowName(name) => {
                    tracing::debug!(window = %name, "Window name bound");
                    self.window_name = Some(name.clone());
                }
                Directive::SessionId(id) => {
                    if !self.set_session_id(id.clone()) {
                        tracing::debug!(id = %id, "Session id already set, ignoring directive");
                    }
                }
                Directive::Bind { key, value } => {
                    self.bindings.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Re-arm for the next run after the driver signalled completion.
    pub fn reset_for_next_run(&mut self) {
        self.pending_result = START.to_string();
        self.continuation = false;
    }

    /// Strictly increasing millisecond counter for cache busting.
    pub fn next_counter(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_counter = now.max(self.last_counter + 1);
        self.last_counter
    }

    /// Build the query parameters of one request.
    ///
    /// `surface_window` is used when no directive has named the window.
    pub fn query_params(
        &mut self,
        body: &str,
        frame_address: &str,
        surface_window: Option<String>,
        replay: bool,
    ) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(7);
        if body == START && !replay {
            query.push((params::START.to_string(), "true".to_string()));
        }
        if replay {
            query.push((params::RETRY.to_string(), "true".to_string()));
        }
        query.push((params::FRAME_ADDRESS.to_string(), frame_address.to_string()));

        let window = self
            .window_name
            .clone()
            .or(surface_window)
            .unwrap_or_default();
        query.push((params::WINDOW_NAME.to_string(), window));

        query.push((params::UNIQUE_ID.to_string(), client_id().to_string()));
        if let Some(id) = &self.session_id {
            query.push((params::SESSION_ID.to_string(), id.clone()));
        }
        let counter = self.next_counter();
        query.push((params::CACHE_BUSTER.to_string(), counter.to_string()));
        query
    }
}
