//! HTTP request and response types.
//!
//! # Design
//! A call starts life as a `RequestDescriptor`: a partial description where
//! every field may be left out. The normalizer fills the gaps from session
//! state and produces a `ResolvedRequest`, which is what a `Transport`
//! executes. Both are plain data so they can be built, compared and logged
//! without touching the network.
//!
//! Query parameters, cookies and headers are kept as ordered pair lists.
//! The remote platform is sensitive to nothing but the serialized form, and
//! keeping insertion order makes that form reproducible.

use serde::Serialize;
use serde_json::Value;

/// HTTP method for a request. `Get` is used when none is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Declared content type of a request, which also decides how its response
/// is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Other(String),
}

impl ContentType {
    pub const JSON: &'static str = "application/json";

    /// Classify a `Content-Type` header value. Parameters such as `charset`
    /// are ignored.
    pub fn parse(value: &str) -> Self {
        let media_type = value.split(';').next().unwrap_or("").trim();
        if media_type.eq_ignore_ascii_case(Self::JSON) {
            ContentType::Json
        } else {
            ContentType::Other(value.to_string())
        }
    }
}

/// A partial description of an HTTP call, before any defaults are applied.
///
/// Build one with [`RequestDescriptor::path`] or [`RequestDescriptor::url`]
/// and the `with_*` methods, then hand it to the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestDescriptor {
    /// Complete URL. When set, `host` and `path` are ignored.
    pub target_url: Option<String>,
    /// Base URL. Falls back to the session's host URL.
    pub host: Option<String>,
    pub path: Option<String>,
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub method: Option<HttpMethod>,
    pub body: Option<Value>,
    pub return_transfer: Option<bool>,
}

impl RequestDescriptor {
    /// Descriptor for a path relative to the session host.
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Descriptor for an absolute URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            target_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.query, key.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.cookies, key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        upsert(&mut self.headers, key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_return_transfer(mut self, return_transfer: bool) -> Self {
        self.return_transfer = Some(return_transfer);
        self
    }
}

/// A fully resolved request, ready for a `Transport`.
///
/// Produced only by [`crate::normalize::normalize`]; `url` and the
/// `Content-Type` header are always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub cookies: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub return_transfer: bool,
}

impl ResolvedRequest {
    pub fn cookie(&self, name: &str) -> Option<&str> {
        lookup(&self.cookies, name).map(String::as_str)
    }

    /// Header lookup. Header names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> ContentType {
        ContentType::parse(self.header("Content-Type").unwrap_or(""))
    }

    /// Cookies serialized as `key=value; key=value`.
    pub fn cookie_string(&self) -> String {
        self.cookies
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Headers serialized as `key: value` lines.
    pub fn header_lines(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect()
    }

    /// Body text to send. Only `POST` and `PUT` carry a body; string bodies
    /// are sent verbatim and anything else is encoded as JSON.
    pub fn body_text(&self) -> Result<Option<String>, serde_json::Error> {
        if !matches!(self.method, HttpMethod::Post | HttpMethod::Put) {
            return Ok(None);
        }
        match &self.body {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(other) => serde_json::to_string(other).map(Some),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

pub(crate) fn lookup<'a, V>(pairs: &'a [(String, V)], key: &str) -> Option<&'a V> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Replace the value stored under `key`, or append a new pair.
pub(crate) fn upsert<V>(pairs: &mut Vec<(String, V)>, key: String, value: V) {
    match pairs.iter_mut().find(|(k, _)| *k == key) {
        Some(slot) => slot.1 = value,
        None => pairs.push((key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolved(method: HttpMethod, body: Option<Value>) -> ResolvedRequest {
        ResolvedRequest {
            url: "https://host/api/login".to_string(),
            method,
            cookies: vec![
                ("authToken".to_string(), "X".to_string()),
                ("foo".to_string(), "bar".to_string()),
            ],
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
            return_transfer: true,
        }
    }

    #[test]
    fn cookie_string_has_no_trailing_separator() {
        let req = resolved(HttpMethod::Get, None);
        assert_eq!(req.cookie_string(), "authToken=X; foo=bar");
    }

    #[test]
    fn cookie_string_empty_without_cookies() {
        let mut req = resolved(HttpMethod::Get, None);
        req.cookies.clear();
        assert_eq!(req.cookie_string(), "");
    }

    #[test]
    fn header_lines_use_colon_separator() {
        let req = resolved(HttpMethod::Get, None);
        assert_eq!(req.header_lines(), vec!["Content-Type: application/json"]);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = resolved(HttpMethod::Get, None);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.content_type(), ContentType::Json);
    }

    #[test]
    fn content_type_ignores_parameters() {
        assert_eq!(ContentType::parse("application/json; charset=utf-8"), ContentType::Json);
        assert_eq!(
            ContentType::parse("text/plain"),
            ContentType::Other("text/plain".to_string())
        );
        assert_eq!(ContentType::parse(""), ContentType::Other(String::new()));
    }

    #[test]
    fn string_body_is_sent_verbatim() {
        let req = resolved(HttpMethod::Post, Some(json!("")));
        assert_eq!(req.body_text().unwrap(), Some(String::new()));
    }

    #[test]
    fn structured_body_is_encoded_as_json() {
        let req = resolved(HttpMethod::Post, Some(json!({"title": "Engineer"})));
        assert_eq!(req.body_text().unwrap().as_deref(), Some(r#"{"title":"Engineer"}"#));
    }

    #[test]
    fn get_never_carries_a_body() {
        let req = resolved(HttpMethod::Get, Some(json!({"ignored": true})));
        assert_eq!(req.body_text().unwrap(), None);
    }

    #[test]
    fn with_query_replaces_existing_key() {
        let desc = RequestDescriptor::path("login")
            .with_query("a", "1")
            .with_query("b", "2")
            .with_query("a", "3");
        assert_eq!(
            desc.query,
            vec![("a".to_string(), "3".to_string()), ("b".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn method_serializes_uppercase() {
        assert_eq!(serde_json::to_value(HttpMethod::Delete).unwrap(), json!("DELETE"));
        assert_eq!(HttpMethod::default(), HttpMethod::Get);
    }
}
