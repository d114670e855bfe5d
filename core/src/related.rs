//! Locating a related record inside a loosely-typed response.
//!
//! The remote service nests a related record under a property whose name
//! varies: sometimes the pluralized entity name, sometimes the lowercase
//! name, sometimes the name as given. [`resolve_key`] tries those in that
//! order.

use serde::Serialize;
use serde_json::{Map, Value};

/// A related record, or the whole response when no property matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelatedRecord {
    /// The record was found under `key`.
    Nested { key: String, record: Value },
    /// No candidate property existed; this is the entire response payload.
    Whole(Value),
}

impl RelatedRecord {
    pub fn record(&self) -> &Value {
        match self {
            RelatedRecord::Nested { record, .. } => record,
            RelatedRecord::Whole(payload) => payload,
        }
    }

    pub fn into_record(self) -> Value {
        match self {
            RelatedRecord::Nested { record, .. } => record,
            RelatedRecord::Whole(payload) => payload,
        }
    }

    /// The property the record was found under.
    pub fn key(&self) -> Option<&str> {
        match self {
            RelatedRecord::Nested { key, .. } => Some(key),
            RelatedRecord::Whole(_) => None,
        }
    }

    /// `true` when name inference failed and the payload was kept whole.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, RelatedRecord::Whole(_))
    }
}

/// First of `candidate + "s"`, `lowercase(candidate)` and `candidate` that
/// is a property of `payload`.
pub fn resolve_key(payload: &Map<String, Value>, candidate: &str) -> Option<String> {
    [
        format!("{candidate}s"),
        candidate.to_lowercase(),
        candidate.to_string(),
    ]
    .into_iter()
    .find(|key| payload.contains_key(key))
}

/// Pull the record for `candidate` out of `payload`.
pub fn extract(payload: Value, candidate: &str) -> RelatedRecord {
    match payload {
        Value::Object(mut map) => match resolve_key(&map, candidate) {
            Some(key) => {
                let record = map.remove(&key).unwrap_or(Value::Null);
                RelatedRecord::Nested { key, record }
            }
            None => RelatedRecord::Whole(Value::Object(map)),
        },
        other => RelatedRecord::Whole(other),
    }
}
