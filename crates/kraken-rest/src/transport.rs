//! HTTP transport abstraction
//!
//! The request pipeline hands a fully prepared [`HttpRequest`] to a
//! [`Transport`] and gets raw bytes back; it never touches the HTTP stack
//! directly. [`ReqwestTransport`] is the production implementation, and
//! `MockTransport` (feature `test-utils`) replays canned responses and
//! records what was sent.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Transport layer errors
///
/// These are never mapped onto exchange errors: a body that cannot be read as
/// a Kraken response is a transport failure, not an API error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established or was reset
    #[error("connection failed: {0}")]
    Connection(String),

    /// Request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status without a readable Kraken response
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Body is not a Kraken response envelope
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// Any other HTTP client failure
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::MalformedBody(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// HTTP verb used by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prepared request, ready to go on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL, query string included
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// URL-encoded form body
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with the given status and body
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 200 OK with a JSON body
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes prepared HTTP requests
///
/// Implementations must be shareable across tasks: one transport serves every
/// concurrent dispatch of a client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request and return the raw response
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(status, len = body.len(), "Received response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Mock transport for testing
///
/// Replays queued responses in order, falling back to an optional default
/// response once the queue is empty, and records every request it receives.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: parking_lot::Mutex<std::collections::VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: parking_lot::Mutex<Option<HttpResponse>>,
    requests: parking_lot::Mutex<Vec<HttpRequest>>,
    delay: parking_lot::Mutex<Option<Duration>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockTransport {
    /// Create a new mock transport with no responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers every request with the same JSON body
    pub fn always(body: impl Into<String>) -> Self {
        let mock = Self::new();
        *mock.fallback.lock() = Some(HttpResponse::ok(body.into()));
        mock
    }

    /// Queue a 200 response with the given JSON body
    pub fn push_response(&self, body: impl Into<String>) {
        self.responses
            .lock()
            .push_back(Ok(HttpResponse::ok(body.into())));
    }

    /// Queue a response with an explicit status
    pub fn push_status(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .push_back(Ok(HttpResponse::new(status, body.into())));
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Delay every response (uses tokio time, so it respects a paused clock)
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.responses.lock().pop_front();
        match queued {
            Some(response) => response,
            None => self
                .fallback
                .lock()
                .clone()
                .ok_or_else(|| TransportError::Connection("no mock response queued".into())),
        }
    }
}
