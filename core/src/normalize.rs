//! Fills in a `RequestDescriptor` from session state.

use serde_json::Value;

use crate::http::{lookup, ContentType, HttpMethod, RequestDescriptor, ResolvedRequest};

pub const AUTH_COOKIE: &str = "authToken";

/// Resolve `descriptor` against the session's `host_url` and `auth_token`.
///
/// The descriptor is left untouched. Rules, in order:
/// 1. without `target_url`, the URL is `host` (or `host_url`) joined to
///    `path` with exactly one slash;
/// 2. a non-empty query is appended after `?` as `key=value` pairs joined by
///    `&`, without percent-encoding;
/// 3. the `authToken` cookie defaults to `auth_token`;
/// 4. `Content-Type` defaults to `application/json`;
/// 5. a `POST` without body gets an empty string body;
/// 6. `return_transfer` defaults to `true`.
pub fn normalize(descriptor: &RequestDescriptor, host_url: &str, auth_token: &str) -> ResolvedRequest {
    let mut url = match &descriptor.target_url {
        Some(url) => url.clone(),
        None => {
            let host = descriptor.host.as_deref().unwrap_or(host_url);
            match &descriptor.path {
                Some(path) => join_url(host, path),
                None => host.to_string(),
            }
        }
    };

    if !descriptor.query.is_empty() {
        url.push('?');
        url.push_str(&query_string(&descriptor.query));
    }

    let mut cookies = descriptor.cookies.clone();
    if lookup(&cookies, AUTH_COOKIE).is_none() {
        cookies.push((AUTH_COOKIE.to_string(), auth_token.to_string()));
    }

    let mut headers = descriptor.headers.clone();
    if !headers.iter().any(|(key, _)| key.eq_ignore_ascii_case("Content-Type")) {
        headers.push(("Content-Type".to_string(), ContentType::JSON.to_string()));
    }

    let method = descriptor.method.unwrap_or_default();
    let body = match (&descriptor.body, method) {
        (None, HttpMethod::Post) => Some(Value::String(String::new())),
        (body, _) => body.clone(),
    };

    ResolvedRequest {
        url,
        method,
        cookies,
        headers,
        body,
        return_transfer: descriptor.return_transfer.unwrap_or(true),
    }
}

/// Join `host` and `path` with exactly one `/` between them.
pub fn join_url(host: &str, path: &str) -> String {
    format!("{}/{}", host.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// `key=value` pairs joined by `&`, emitted as given.
pub fn query_string(query: &[(String, String)]) -> String {
    query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}
