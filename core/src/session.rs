//! Authentication state and request dispatch.
//!
//! # Design
//! `Session` owns the host URL and auth token, the error log and the
//! transport. Every call goes through [`Session::request`]: normalize
//! against the current state, execute once, interpret. Application errors
//! are appended to the log before being returned, so a caller can inspect
//! either the returned error or the history.
//!
//! The session is a plain value used from one flow at a time; there is no
//! interior locking.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::endpoint::Endpoint;
use crate::error::{ApiError, ErrorRecord};
use crate::http::{HttpMethod, RequestDescriptor};
use crate::normalize::{normalize, AUTH_COOKIE};
use crate::response::{interpret, Payload};
use crate::transport::{Transport, UreqTransport};

/// Whether the session holds both a host URL and an auth token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggedIn,
}

pub struct Session<T = UreqTransport> {
    config: SessionConfig,
    host_url: String,
    auth_token: String,
    errors: Vec<ErrorRecord>,
    transport: T,
}

impl<T: fmt::Debug> fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("host_url", &self.host_url)
            .field("auth_token", &(!self.auth_token.is_empty()).then_some("<redacted>"))
            .field("errors", &self.errors.len())
            .field("transport", &self.transport)
            .finish()
    }
}

impl Session<UreqTransport> {
    pub fn new(config: SessionConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Session<T> {
    pub fn with_transport(config: SessionConfig, transport: T) -> Self {
        Self {
            host_url: config.host_url.clone().unwrap_or_default(),
            auth_token: config.auth_token.clone().unwrap_or_default(),
            config,
            errors: Vec::new(),
            transport,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    pub fn set_host_url(&mut self, host_url: impl Into<String>) {
        self.host_url = host_url.into();
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    pub fn set_auth_token(&mut self, auth_token: impl Into<String>) {
        self.auth_token = auth_token.into();
    }

    /// Every application error seen by this session, oldest first.
    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.errors.last()
    }

    pub fn state(&self) -> SessionState {
        if self.host_url.is_empty() || self.auth_token.is_empty() {
            SessionState::LoggedOut
        } else {
            SessionState::LoggedIn
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.state() == SessionState::LoggedIn
    }

    /// Normalize, execute and interpret one request.
    pub fn request(&mut self, descriptor: &RequestDescriptor) -> Result<Payload, ApiError> {
        let request = normalize(descriptor, &self.host_url, &self.auth_token);
        debug!(
            method = request.method.as_str(),
            url = without_query(&request.url),
            headers = ?request.header_lines(),
            "dispatching request"
        );

        let response = self.transport.execute(&request)?;
        let result = interpret(&request, response);

        if let Err(ApiError::Application(record)) = &result {
            warn!(
                operation = %record.kind,
                code = %record.code,
                message = %record.message,
                "remote service rejected request"
            );
            self.errors.push(record.clone());
        }
        result
    }

    /// Like [`Session::request`], with the payload as JSON.
    pub fn request_json(&mut self, descriptor: &RequestDescriptor) -> Result<serde_json::Value, ApiError> {
        self.request(descriptor).map(Payload::into_json)
    }

    /// Ask the discovery service for this company's host URL. Nothing is
    /// stored.
    pub fn fetch_host_url(&mut self) -> Result<String, ApiError> {
        let descriptor =
            RequestDescriptor::path(self.config.company_code.clone()).with_host(self.config.service_url.clone());
        let payload = self.request_json(&descriptor)?;
        string_field(&payload, "URL", "host URL discovery")
    }

    /// Request a fresh auth token for the configured user. Nothing is stored.
    pub fn fetch_auth_token(&mut self) -> Result<String, ApiError> {
        let descriptor = RequestDescriptor::path(Endpoint::Login.path())
            .with_method(HttpMethod::Post)
            .with_query("orgCode", self.config.company_code.clone())
            .with_query("userName", self.config.username.clone())
            .with_query("password", self.config.password.clone());
        let payload = self.request_json(&descriptor)?;
        string_field(&payload, "authToken", "login")
    }

    /// Invalidate `auth_token` on the remote side.
    pub fn release_auth_token(&mut self, auth_token: &str) -> Result<(), ApiError> {
        let descriptor = RequestDescriptor::path(Endpoint::Logout.path())
            .with_method(HttpMethod::Post)
            .with_cookie(AUTH_COOKIE, auth_token);
        self.request(&descriptor).map(|_| ())
    }

    /// Fetch whatever of host URL and auth token is missing.
    ///
    /// Values already present are kept, so a session configured with both
    /// logs in without any network call. On failure the missing value stays
    /// empty and the session remains logged out.
    pub fn login(&mut self) -> Result<(), ApiError> {
        if self.host_url.is_empty() {
            self.host_url = self.fetch_host_url()?;
            debug!(host_url = %self.host_url, "host URL discovered");
        }
        if self.auth_token.is_empty() {
            self.auth_token = self.fetch_auth_token()?;
        }
        info!(company = %self.config.company_code, "logged in");
        Ok(())
    }

    /// Release the auth token and clear the local session.
    ///
    /// Host URL and auth token are cleared together whether or not the
    /// release succeeded; the release outcome is returned.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        let result = if self.auth_token.is_empty() {
            Ok(())
        } else {
            let token = self.auth_token.clone();
            self.release_auth_token(&token)
        };

        self.auth_token.clear();
        self.host_url.clear();

        match &result {
            Ok(()) => info!(company = %self.config.company_code, "logged out"),
            Err(e) => warn!(error = %e, "auth token release failed; local session cleared"),
        }
        result
    }
}

/// The login query carries the password, so only scheme, host and path are
/// logged.
fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

fn string_field(payload: &serde_json::Value, field: &str, context: &str) -> Result<String, ApiError> {
    payload
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::missing(field, context))
}
