//! Decodes raw responses according to the request's declared content type.
//!
//! # Design
//! JSON responses are wrapped in an envelope:
//!
//! ```json
//! { "status": { "success": true }, "response": { ... } }
//! { "status": { "success": false, "detail": { "errormessage": "...",
//!   "operation": "...", "errorcode": "...", "error": "..." } } }
//! ```
//!
//! `interpret` is pure: it turns a failure envelope into
//! `ApiError::Application` and leaves logging the record to the session.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, ErrorRecord};
use crate::http::{ContentType, HttpResponse, ResolvedRequest};

/// A decoded response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The `response` member of a successful JSON envelope.
    Json(Value),
    /// Body of a response whose declared content type is not JSON, returned
    /// uninterpreted.
    Raw(String),
}

impl Payload {
    /// Convert to a JSON value; raw text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Raw(text) => Value::String(text),
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Raw(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: Status,
    #[serde(default)]
    response: Value,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    detail: Option<Detail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Detail {
    #[serde(deserialize_with = "lenient_string")]
    errormessage: String,
    #[serde(deserialize_with = "lenient_string")]
    operation: String,
    #[serde(deserialize_with = "lenient_string")]
    errorcode: String,
    #[serde(deserialize_with = "lenient_string")]
    error: String,
}

/// Accept strings, numbers and null for diagnostic fields.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Interpret `response` as the answer to `request`.
pub fn interpret(request: &ResolvedRequest, response: HttpResponse) -> Result<Payload, ApiError> {
    match request.content_type() {
        ContentType::Json => interpret_json(request, &response.body),
        ContentType::Other(_) => Ok(Payload::Raw(response.body)),
    }
}

fn interpret_json(request: &ResolvedRequest, body: &str) -> Result<Payload, ApiError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| ApiError::MalformedResponse(e.to_string()))?;

    if envelope.status.success {
        return Ok(Payload::Json(envelope.response));
    }

    let detail = envelope.status.detail.unwrap_or_default();
    Err(ApiError::Application(ErrorRecord {
        request: request.clone(),
        message: detail.errormessage,
        kind: detail.operation,
        code: detail.errorcode,
        detail: detail.error,
    }))
}
