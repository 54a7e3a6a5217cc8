//! Driver transport.
//!
//! One request is outstanding at a time: the loop posts the pending result
//! and waits for the next command in the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::codec;
use crate::error::{RunnerError, RunnerResult, TransportFailure};

/// One poll of the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    /// Wire result being reported.
    pub body: String,
    /// Query parameters, in order.
    pub params: Vec<(String, String)>,
}

/// Carries poll requests to the driver.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post `request` and return the response body.
    ///
    /// Anything but HTTP 200 is a [`TransportFailure`].
    async fn poll(&self, request: &PollRequest) -> Result<String, TransportFailure>;
}

/// HTTP transport backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for `endpoint`.
    ///
    /// `timeout` of `None` leaves requests unbounded; driver polls are long.
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> RunnerResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RunnerError::Client(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn poll(&self, request: &PollRequest) -> Result<String, TransportFailure> {
        tracing::debug!(endpoint = %self.endpoint, body = %request.body, "Polling driver");

        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&request.params)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(codec::encode_body(&request.body))
            .send()
            .await
            .map_err(|e| TransportFailure::connection(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransportFailure {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| TransportFailure::connection(e.to_string()))
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
