//! Executes resolved requests over HTTP.
//!
//! # Design
//! `Transport` is the only seam that performs I/O. The session owns one and
//! hands it every `ResolvedRequest`; tests swap in a scripted double. Each
//! call makes exactly one attempt and retry policy is left to the caller.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpResponse, ResolvedRequest};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes one request and returns the raw response.
pub trait Transport {
    fn execute(&self, request: &ResolvedRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// Non-2xx statuses are returned as data: the remote platform reports its
/// own failures inside the response body.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &ResolvedRequest) -> Result<HttpResponse, TransportError> {
        let body = request.body_text().map_err(|e| TransportError::Encode(e.to_string()))?;
        let cookie = request.cookie_string();
        let url = request.url.as_str();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), request, &cookie).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), request, &cookie).call(),
            HttpMethod::Post => {
                let builder = with_headers(self.agent.post(url), request, &cookie);
                match &body {
                    Some(text) => builder.send(text.as_bytes()),
                    None => builder.send_empty(),
                }
            }
            HttpMethod::Put => {
                let builder = with_headers(self.agent.put(url), request, &cookie);
                match &body {
                    Some(text) => builder.send(text.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result?;
        let status = response.status().as_u16();
        let body = if request.return_transfer {
            response.body_mut().read_to_string()?
        } else {
            String::new()
        };
        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse { status, body })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &ResolvedRequest,
    cookie: &str,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if !cookie.is_empty() {
        builder = builder.header("Cookie", cookie);
    }
    builder
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(which) => TransportError::Timeout(format!("{which:?}")),
            ureq::Error::HostNotFound => TransportError::Connect("host not found".to_string()),
            ureq::Error::ConnectionFailed => TransportError::Connect("connection refused".to_string()),
            ureq::Error::Io(e) => TransportError::Io(e.to_string()),
            other => TransportError::Other(other.to_string()),
        }
    }
}
