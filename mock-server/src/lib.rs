//! In-process stand-in for the Taleo Business Edition API.
//!
//! Serves the URL-discovery endpoint at `/serviceUrl/{company}` and the API
//! itself under `/api`. Every API response uses the Taleo envelope, and
//! failures are reported inside it as well as through the HTTP status.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const COMPANY_CODE: &str = "ACME";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";

#[derive(Clone)]
pub struct AppState {
    /// Absolute base URL clients are sent to, without trailing slash.
    host_url: String,
    tokens: Arc<RwLock<HashSet<String>>>,
}

impl AppState {
    pub fn new(host_url: impl Into<String>) -> Self {
        Self {
            host_url: host_url.into(),
            tokens: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn active_tokens(&self) -> usize {
        self.tokens.read().await.len()
    }
}

type Reply = (StatusCode, Json<Value>);

/// Router for a server reachable at `base_url` (e.g. `http://127.0.0.1:3000`).
pub fn app(base_url: &str) -> Router {
    app_with_state(AppState::new(format!("{}/api", base_url.trim_end_matches('/'))))
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/object/info", get(entities))
        .route("/object/info/{entity}", get(entity))
        .route("/object/status/{entity}", get(statuses))
        .route("/object/displayfield/{code}/{field}", get(display_field))
        .route("/object/{entity}", get(all_records))
        .route("/object/{entity}/search", get(search))
        .route("/object/{entity}/description/standard", get(standard_fields))
        .route("/object/{entity}/description/custom", get(custom_fields))
        .route("/object/{entity}/{id}", get(record))
        .route("/object/{entity}/{id}/{related}", get(related_record));

    Router::new()
        .route("/serviceUrl/{company}", get(service_url))
        .nest("/api", api)
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    info!(%addr, "mock Taleo API listening");
    axum::serve(listener, app(&format!("http://{addr}"))).await
}

fn ok(response: Value) -> Reply {
    (
        StatusCode::OK,
        Json(json!({"response": response, "status": {"success": true, "detail": {}}})),
    )
}

fn fail(status: StatusCode, operation: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({"response": {}, "status": {"success": false, "detail": {
            "errormessage": message,
            "operation": operation,
            "errorcode": status.as_u16().to_string(),
            "error": status.canonical_reason().unwrap_or("Error"),
        }}})),
    )
}

fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

async fn authorize(state: &AppState, headers: &HeaderMap, operation: &str) -> Result<(), Reply> {
    let token = cookie(headers, "authToken").unwrap_or_default();
    if state.tokens.read().await.contains(&token) {
        Ok(())
    } else {
        Err(fail(StatusCode::UNAUTHORIZED, operation, "Authentication token is invalid or expired"))
    }
}

async fn service_url(State(state): State<AppState>, Path(company): Path<String>) -> Reply {
    if company != COMPANY_CODE {
        return fail(StatusCode::NOT_FOUND, "serviceUrl", "Unknown company code");
    }
    ok(json!({"URL": state.host_url}))
}

async fn login(State(state): State<AppState>, Query(query): Query<HashMap<String, String>>) -> Reply {
    let matches = |key: &str, expected: &str| query.get(key).map(String::as_str) == Some(expected);
    if !(matches("orgCode", COMPANY_CODE) && matches("userName", USERNAME) && matches("password", PASSWORD)) {
        return fail(StatusCode::UNAUTHORIZED, "login", "Invalid credentials");
    }
    let token = Uuid::new_v4().to_string();
    state.tokens.write().await.insert(token.clone());
    debug!("token issued");
    ok(json!({"authToken": token}))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    let token = cookie(&headers, "authToken").unwrap_or_default();
    if state.tokens.write().await.remove(&token) {
        ok(json!({}))
    } else {
        fail(StatusCode::UNAUTHORIZED, "logout", "Authentication token is invalid or expired")
    }
}

/// Entity metadata: (name, label, code).
const ENTITIES: [(&str, &str, &str); 3] = [
    ("requisition", "Requisition", "REQU"),
    ("candidate", "Candidate", "CAND"),
    ("user", "User", "USER"),
];

fn by_name(name: &str) -> Option<(&'static str, &'static str, &'static str)> {
    ENTITIES.into_iter().find(|(n, _, _)| *n == name)
}

fn by_label(label: &str) -> Option<(&'static str, &'static str, &'static str)> {
    ENTITIES.into_iter().find(|(_, l, _)| *l == label)
}

async fn entities(State(state): State<AppState>, headers: HeaderMap) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "entities").await {
        return reply;
    }
    let objects: Vec<Value> = ENTITIES
        .iter()
        .map(|(name, label, _)| json!({"name": name, "label": label}))
        .collect();
    ok(json!({"objects": objects}))
}

async fn entity(State(state): State<AppState>, headers: HeaderMap, Path(name): Path<String>) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "entity").await {
        return reply;
    }
    match by_name(&name) {
        Some((name, label, _)) => ok(json!({"name": name, "label": label, "searchable": true})),
        None => fail(StatusCode::NOT_FOUND, "entity", "Unknown entity"),
    }
}

async fn statuses(State(state): State<AppState>, headers: HeaderMap, Path(name): Path<String>) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "status").await {
        return reply;
    }
    match by_name(&name) {
        Some(_) => ok(json!({"statuses": [{"id": 1, "name": "Open"}, {"id": 2, "name": "Closed"}]})),
        None => fail(StatusCode::NOT_FOUND, "status", "Unknown entity"),
    }
}

async fn standard_fields(State(state): State<AppState>, headers: HeaderMap, Path(label): Path<String>) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "description").await {
        return reply;
    }
    match by_label(&label) {
        Some((_, _, code)) => ok(json!({
            "code": code,
            "fields": [
                {"fieldName": "id", "type": "int"},
                {"fieldName": "status", "type": "lookup"},
                {"fieldName": "title", "type": "text"}
            ]
        })),
        None => fail(StatusCode::NOT_FOUND, "description", "Unknown entity label"),
    }
}

async fn custom_fields(State(state): State<AppState>, headers: HeaderMap, Path(label): Path<String>) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "description").await {
        return reply;
    }
    match by_label(&label) {
        Some(_) => ok(json!({"fields": [{"fieldName": "hiringBonus", "type": "currency"}]})),
        None => fail(StatusCode::NOT_FOUND, "description", "Unknown entity label"),
    }
}

async fn display_field(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((code, field)): Path<(String, String)>,
) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "displayfield").await {
        return reply;
    }
    if !ENTITIES.iter().any(|(_, _, c)| *c == code) {
        return fail(StatusCode::NOT_FOUND, "displayfield", "Unknown entity code");
    }
    let description = match field.as_str() {
        "status" => json!({"fieldName": "status", "lookupValues": ["Open", "Filled", "Cancelled"]}),
        "title" | "id" => json!({"fieldName": field, "type": "text"}),
        _ => return fail(StatusCode::NOT_FOUND, "displayfield", "Unknown field"),
    };
    let mut display = serde_json::Map::new();
    display.insert(field, description);
    ok(json!({"displayfield": display}))
}

fn requisitions() -> Vec<Value> {
    vec![
        json!({"id": 1, "title": "Rust Engineer", "status": "Open"}),
        json!({"id": 2, "title": "Recruiter", "status": "Filled"}),
    ]
}

fn requisition(state: &AppState, id: u64) -> Option<Value> {
    let mut found = requisitions().into_iter().find(|r| r["id"] == id)?;
    let base = format!("{}/object/requisition/{id}", state.host_url);
    found["relationshipUrls"] = json!({
        "user": format!("{base}/user"),
        "Attachment": format!("{base}/attachment"),
        "Candidate": format!("{base}/candidate"),
        "history": format!("{base}/history"),
    });
    Some(found)
}

async fn all_records(State(state): State<AppState>, headers: HeaderMap, Path(entity): Path<String>) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "records").await {
        return reply;
    }
    match entity.as_str() {
        "requisition" => ok(json!({"requisitions": requisitions()})),
        _ => fail(StatusCode::NOT_FOUND, "records", "Unknown entity"),
    }
}

async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(entity): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "search").await {
        return reply;
    }
    if entity != "requisition" {
        return fail(StatusCode::NOT_FOUND, "search", "Unknown entity");
    }
    let hits: Vec<Value> = requisitions()
        .into_iter()
        .filter(|r| query.iter().all(|(key, value)| r[key.as_str()].as_str() == Some(value.as_str())))
        .collect();
    ok(json!({"pagination": {"total": hits.len()}, "searchResults": hits}))
}

async fn record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((entity, id)): Path<(String, u64)>,
) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "record").await {
        return reply;
    }
    match (entity.as_str(), requisition(&state, id)) {
        ("requisition", Some(found)) => ok(json!({"requisition": found})),
        _ => fail(StatusCode::NOT_FOUND, "record", "Record not found"),
    }
}

async fn related_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((entity, id, related)): Path<(String, u64, String)>,
) -> Reply {
    if let Err(reply) = authorize(&state, &headers, "related").await {
        return reply;
    }
    if entity != "requisition" || requisition(&state, id).is_none() {
        return fail(StatusCode::NOT_FOUND, "related", "Record not found");
    }
    // Each relation nests its payload differently, matching the live API.
    match related.to_lowercase().as_str() {
        "user" => ok(json!({"users": [{"id": 10, "userName": "ada"}]})),
        "candidate" => ok(json!({"candidate": [{"id": 20, "firstName": "Grace"}]})),
        "history" => ok(json!({"entries": [{"action": "created"}]})),
        _ => fail(StatusCode::NOT_FOUND, "related", "No such relationship"),
    }
}
