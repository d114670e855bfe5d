//! Error types for the Taleo API client.
//!
//! # Design
//! Failures are split by where they happen. `TransportError` covers the
//! network round-trip, `ApiError::MalformedResponse` a body that claims to
//! be JSON but is not, and `ApiError::Application` a well-formed envelope in
//! which the remote service reports that the call failed. Only the last kind
//! carries an `ErrorRecord`, and only that kind is appended to the session's
//! error log.

use serde::Serialize;
use thiserror::Error;

use crate::http::ResolvedRequest;

/// Diagnostic detail for a call the remote service rejected.
///
/// Created once per failed call and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// The request exactly as it was sent.
    pub request: ResolvedRequest,
    pub message: String,
    /// The remote `operation` that failed, e.g. `login`.
    pub kind: String,
    /// Remote error code, kept as sent (`"401"`).
    pub code: String,
    pub detail: String,
}

/// Failures of a single HTTP round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("request body could not be encoded: {0}")]
    Encode(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// Errors returned by session and resolver operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response was declared JSON but could not be decoded as a Taleo
    /// envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The remote service reported failure in its response envelope.
    #[error("{} failed with code {}: {}", .0.kind, .0.code, .0.message)]
    Application(ErrorRecord),

    /// A successful response did not contain the expected property.
    #[error("response for {context} has no `{field}`")]
    MissingField { field: String, context: String },

    #[error("field `{field}` has no lookup values")]
    NoLookupValues { field: String },

    #[error("no related records could be resolved for {entity} {id}")]
    NoRelatedRecords { entity: String, id: u64 },
}

impl ApiError {
    pub(crate) fn missing(field: &str, context: impl Into<String>) -> Self {
        ApiError::MissingField {
            field: field.to_string(),
            context: context.into(),
        }
    }

    /// The remote diagnostic, if the service itself rejected the call.
    pub fn record(&self) -> Option<&ErrorRecord> {
        match self {
            ApiError::Application(record) => Some(record),
            _ => None,
        }
    }
}

/// Errors raised while loading a `SessionConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}
