//! Entity metadata and record retrieval.
//!
//! # Design
//! `TaleoClient` owns a `Session` and turns each operation into one or more
//! `RequestDescriptor`s built from [`Endpoint`] paths. Payloads stay
//! `serde_json::Value`: entity schemas differ per tenant and the client
//! only pulls out the few properties it needs (`label`, `code`, `fields`,
//! `relationshipUrls`).
//!
//! Several lookups chain: an entity's code is found by label, and a field
//! by code, so one call may issue up to three requests.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::endpoint::Endpoint;
use crate::error::ApiError;
use crate::http::{upsert, RequestDescriptor};
use crate::related::{extract, RelatedRecord};
use crate::session::Session;
use crate::transport::{Transport, UreqTransport};

/// Related records keyed by entity name, in the order they were fetched.
pub type RelatedRecords = Vec<(String, RelatedRecord)>;

#[derive(Debug)]
pub struct TaleoClient<T = UreqTransport> {
    session: Session<T>,
}

impl TaleoClient<UreqTransport> {
    pub fn new(config: SessionConfig) -> Self {
        Self::from_session(Session::new(config))
    }
}

impl<T: Transport> TaleoClient<T> {
    pub fn from_session(session: Session<T>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<T> {
        self.session
    }

    pub fn login(&mut self) -> Result<(), ApiError> {
        self.session.login()
    }

    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.session.logout()
    }

    fn get(&mut self, endpoint: Endpoint<'_>) -> Result<Value, ApiError> {
        self.session.request_json(&RequestDescriptor::path(endpoint.path()))
    }

    /// All entities the account can see.
    pub fn get_entities(&mut self) -> Result<Value, ApiError> {
        let response = self.get(Endpoint::Entities)?;
        take(response, "objects", "entities")
    }

    pub fn get_entity(&mut self, entity_name: &str) -> Result<Value, ApiError> {
        self.get(Endpoint::Entity(entity_name))
    }

    /// Display name of an entity, used to key its field descriptions.
    pub fn get_entity_label(&mut self, entity_name: &str) -> Result<String, ApiError> {
        let entity = self.get_entity(entity_name)?;
        text(&entity, "label", entity_name)
    }

    /// Internal short code of an entity, read from its standard field
    /// description.
    pub fn get_entity_code(&mut self, entity_name: &str) -> Result<String, ApiError> {
        let label = self.get_entity_label(entity_name)?;
        let description = self.get(Endpoint::StandardFields(&label))?;
        text(&description, "code", &label)
    }

    pub fn get_entity_standard_fields(&mut self, entity_name: &str) -> Result<Vec<Value>, ApiError> {
        let label = self.get_entity_label(entity_name)?;
        let description = self.get(Endpoint::StandardFields(&label))?;
        fields(description, &label)
    }

    pub fn get_entity_custom_fields(&mut self, entity_name: &str) -> Result<Vec<Value>, ApiError> {
        let label = self.get_entity_label(entity_name)?;
        let description = self.get(Endpoint::CustomFields(&label))?;
        fields(description, &label)
    }

    /// Standard fields followed by custom fields, without deduplication.
    pub fn get_entity_fields(&mut self, entity_name: &str) -> Result<Vec<Value>, ApiError> {
        let mut all = self.get_entity_standard_fields(entity_name)?;
        all.extend(self.get_entity_custom_fields(entity_name)?);
        Ok(all)
    }

    /// Display-field description of one field, looked up by entity code.
    pub fn get_entity_field(&mut self, entity_name: &str, field_name: &str) -> Result<Value, ApiError> {
        let code = self.get_entity_code(entity_name)?;
        let response = self.get(Endpoint::DisplayField {
            code: &code,
            field: field_name,
        })?;
        let display = take(response, "displayfield", field_name)?;
        take(display, field_name, "displayfield")
    }

    /// Allowed values of a lookup field.
    pub fn get_entity_field_values(&mut self, entity_name: &str, field_name: &str) -> Result<Value, ApiError> {
        let field = self.get_entity_field(entity_name, field_name)?;
        take(field, "lookupValues", field_name).map_err(|_| ApiError::NoLookupValues {
            field: field_name.to_string(),
        })
    }

    pub fn get_entity_statuses(&mut self, entity_name: &str) -> Result<Value, ApiError> {
        self.get(Endpoint::EntityStatuses(entity_name))
    }

    pub fn get_record(&mut self, entity_name: &str, record_id: u64) -> Result<Value, ApiError> {
        let response = self.get(Endpoint::Record {
            entity: entity_name,
            id: record_id,
        })?;
        take(response, entity_name, &format!("{entity_name} {record_id}"))
    }

    /// Search records. Query values are sent as given, without encoding.
    pub fn get_records(&mut self, entity_name: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let descriptor = query.iter().fold(
            RequestDescriptor::path(Endpoint::RecordsSearch(entity_name).path()),
            |descriptor, (key, value)| descriptor.with_query(*key, *value),
        );
        self.session.request_json(&descriptor)
    }

    pub fn get_all_records(&mut self, entity_name: &str) -> Result<Value, ApiError> {
        self.get(Endpoint::Records(entity_name))
    }

    pub fn get_related_record(
        &mut self,
        entity_name: &str,
        record_id: u64,
        related_entity_name: &str,
    ) -> Result<RelatedRecord, ApiError> {
        let response = self.get(Endpoint::RelatedRecord {
            entity: entity_name,
            id: record_id,
            related: related_entity_name,
        })?;
        Ok(extract(response, related_entity_name))
    }

    /// Fetch several related records of one record.
    ///
    /// With names given, each is fetched through `get_related_record` and
    /// keyed by that name. With an empty slice, every `relationshipUrls`
    /// link of the record is followed in order and keyed by the property the
    /// record was found under. Individual failures are skipped; the call
    /// fails only when nothing at all was resolved.
    pub fn get_related_records(
        &mut self,
        entity_name: &str,
        record_id: u64,
        related_entity_names: &[&str],
    ) -> Result<RelatedRecords, ApiError> {
        let mut related = RelatedRecords::new();

        if related_entity_names.is_empty() {
            let record = self.get_record(entity_name, record_id)?;
            let links = match record.get("relationshipUrls") {
                Some(Value::Object(links)) => links.clone(),
                _ => return Err(ApiError::missing("relationshipUrls", format!("{entity_name} {record_id}"))),
            };

            for (name, url) in &links {
                let Some(url) = url.as_str() else {
                    warn!(relationship = %name, "relationship link is not a URL; skipped");
                    continue;
                };
                match self.session.request_json(&RequestDescriptor::url(url)) {
                    Ok(payload) => {
                        let record = extract(payload, name);
                        let key = record.key().unwrap_or(name).to_string();
                        debug!(relationship = %name, key = %key, ambiguous = record.is_ambiguous(), "related record resolved");
                        upsert(&mut related, key, record);
                    }
                    Err(e) => warn!(relationship = %name, error = %e, "related record skipped"),
                }
            }
        } else {
            for &name in related_entity_names {
                match self.get_related_record(entity_name, record_id, name) {
                    Ok(record) => upsert(&mut related, name.to_string(), record),
                    Err(e) => warn!(relationship = %name, error = %e, "related record skipped"),
                }
            }
        }

        if related.is_empty() {
            return Err(ApiError::NoRelatedRecords {
                entity: entity_name.to_string(),
                id: record_id,
            });
        }
        Ok(related)
    }
}

/// Move `field` out of `value`. A missing or null property is an error.
fn take(mut value: Value, field: &str, context: &str) -> Result<Value, ApiError> {
    value
        .as_object_mut()
        .and_then(|map| map.remove(field))
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::missing(field, context))
}

fn text(value: &Value, field: &str, context: &str) -> Result<String, ApiError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::missing(field, context))
}

fn fields(description: Value, label: &str) -> Result<Vec<Value>, ApiError> {
    match take(description, "fields", label)? {
        Value::Array(fields) => Ok(fields),
        _ => Err(ApiError::missing("fields", label)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::transport::testing::ScriptedTransport;
    use serde_json::json;

    const HOST: &str = "https://ch.tbe.taleo.net/CH07/ats/api/v1";

    fn ok(response: Value) -> String {
        json!({"response": response, "status": {"success": true, "detail": {}}}).to_string()
    }

    fn not_found(operation: &str) -> String {
        json!({"status": {"success": false, "detail": {
            "errormessage": "Not found", "operation": operation, "errorcode": "404", "error": "NotFound"
        }}})
        .to_string()
    }

    fn client(transport: ScriptedTransport) -> TaleoClient<ScriptedTransport> {
        let config = SessionConfig::new("ACME", "admin", "secret", "https://tbe.taleo.net/serviceUrl")
            .with_host_url(HOST)
            .with_auth_token("tok");
        TaleoClient::from_session(Session::with_transport(config, transport))
    }

    fn urls(client: &TaleoClient<ScriptedTransport>) -> Vec<String> {
        client.session().transport().urls()
    }

    #[test]
    fn entities_come_from_objects() {
        let transport = ScriptedTransport::new().reply(&ok(json!({"objects": [{"name": "requisition"}]})));
        let mut client = client(transport);

        let entities = client.get_entities().unwrap();

        assert_eq!(entities, json!([{"name": "requisition"}]));
        assert_eq!(urls(&client), vec![format!("{HOST}/object/info")]);
    }

    #[test]
    fn code_is_looked_up_by_label() {
        let transport = ScriptedTransport::new()
            .reply(&ok(json!({"label": "Requisition"})))
            .reply(&ok(json!({"code": "REQU", "fields": []})));
        let mut client = client(transport);

        assert_eq!(client.get_entity_code("requisition").unwrap(), "REQU");
        assert_eq!(
            urls(&client),
            vec![
                format!("{HOST}/object/info/requisition"),
                format!("{HOST}/object/Requisition/description/standard"),
            ]
        );
    }

    #[test]
    fn fields_are_standard_then_custom_without_dedup() {
        let transport = ScriptedTransport::new()
            .reply(&ok(json!({"label": "Candidate"})))
            .reply(&ok(json!({"fields": [{"name": "id"}, {"name": "email"}]})))
            .reply(&ok(json!({"label": "Candidate"})))
            .reply(&ok(json!({"fields": [{"name": "email"}, {"name": "shoeSize"}]})));
        let mut client = client(transport);

        let fields = client.get_entity_fields("candidate").unwrap();

        let names: Vec<&str> = fields.iter().filter_map(|f| f["name"].as_str()).collect();
        assert_eq!(names, vec!["id", "email", "email", "shoeSize"]);
        assert!(urls(&client)[3].ends_with("/object/Candidate/description/custom"));
    }

    #[test]
    fn field_failure_in_custom_fails_whole_call() {
        let transport = ScriptedTransport::new()
            .reply(&ok(json!({"label": "Candidate"})))
            .reply(&ok(json!({"fields": [{"name": "id"}]})))
            .reply(&ok(json!({"label": "Candidate"})))
            .reply(&not_found("describe"));
        let mut client = client(transport);

        assert!(matches!(client.get_entity_fields("candidate"), Err(ApiError::Application(_))));
        assert_eq!(client.session().errors().len(), 1);
    }

    #[test]
    fn field_is_looked_up_by_code() {
        let transport = ScriptedTransport::new()
            .reply(&ok(json!({"label": "Requisition"})))
            .reply(&ok(json!({"code": "REQU"})))
            .reply(&ok(json!({"displayfield": {"status": {"lookupValues": ["Open", "Closed"]}}})));
        let mut client = client(transport);

        let field = client.get_entity_field("requisition", "status").unwrap();

        assert_eq!(field, json!({"lookupValues": ["Open", "Closed"]}));
        assert_eq!(urls(&client)[2], format!("{HOST}/object/displayfield/REQU/status"));
    }

    #[test]
    fn field_values_require_lookup_values() {
        let transport = ScriptedTransport::new()
            .reply(&ok(json!({"label": "Requisition"})))
            .reply(&ok(json!({"code": "REQU"})))
            .reply(&ok(json!({"displayfield": {"title": {"type": "text"}}})));
        let mut client = client(transport);

        let err = client.get_entity_field_values("requisition", "title").unwrap_err();
        assert!(matches!(err, ApiError::NoLookupValues { ref field } if field == "title"));
    }

    #[test]
    fn record_is_unwrapped_by_entity_name() {
        let transport = ScriptedTransport::new().reply(&ok(json!({"candidate": {"id": 42}})));
        let mut client = client(transport);

        assert_eq!(client.get_record("candidate", 42).unwrap(), json!({"id": 42}));
        assert_eq!(urls(&client), vec![format!("{HOST}/object/candidate/42")]);
    }

    #[test]
    fn records_search_passes_query() {
        let transport = ScriptedTransport::new().reply(&ok(json!({"candidates": []})));
        let mut client = client(transport);

        client.get_records("candidate", &[("status", "new"), ("city", "Boston")]).unwrap();

        assert_eq!(
            urls(&client),
            vec![format!("{HOST}/object/candidate/search?status=new&city=Boston")]
        );
    }

    #[test]
    fn related_record_uses_name_inference() {
        let transport = ScriptedTransport::new().reply(&ok(json!({"users": [{"id": 1}]})));
        let mut client = client(transport);

        let related = client.get_related_record("requisition", 7, "user").unwrap();

        assert_eq!(related.key(), Some("users"));
        assert_eq!(related.record(), &json!([{"id": 1}]));
        assert_eq!(urls(&client), vec![format!("{HOST}/object/requisition/7/user")]);
    }

    #[test]
    fn related_records_follow_relationship_urls_and_skip_failures() {
        let record = json!({"requisition": {"id": 7, "relationshipUrls": {
            "user": "https://h/object/requisition/7/user",
            "Attachment": "https://h/object/requisition/7/attachment",
            "Candidate": "https://h/object/requisition/7/candidate"
        }}});
        let transport = ScriptedTransport::new()
            .reply(&ok(record))
            .reply(&ok(json!({"users": [{"id": 1}]})))
            .reply(&not_found("attachment"))
            .reply(&ok(json!({"candidate": [{"id": 3}]})));
        let mut client = client(transport);

        let related = client.get_related_records("requisition", 7, &[]).unwrap();

        let keys: Vec<&str> = related.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["users", "candidate"]);
        assert_eq!(related[1].1.record(), &json!([{"id": 3}]));
        assert_eq!(
            urls(&client)[1..],
            [
                "https://h/object/requisition/7/user".to_string(),
                "https://h/object/requisition/7/attachment".to_string(),
                "https://h/object/requisition/7/candidate".to_string(),
            ]
        );
        assert_eq!(client.session().errors().len(), 1);
    }

    #[test]
    fn related_records_keep_ambiguous_payload_under_given_name() {
        let record = json!({"requisition": {"relationshipUrls": {"history": "https://h/history"}}});
        let transport = ScriptedTransport::new()
            .reply(&ok(record))
            .reply(&ok(json!({"entries": [1, 2]})));
        let mut client = client(transport);

        let related = client.get_related_records("requisition", 7, &[]).unwrap();

        assert_eq!(related.len(), 1);
        assert_eq!(related[0].0, "history");
        assert!(related[0].1.is_ambiguous());
        assert_eq!(related[0].1.record(), &json!({"entries": [1, 2]}));
    }

    #[test]
    fn related_records_fail_when_nothing_resolves() {
        let record = json!({"requisition": {"relationshipUrls": {"user": "https://h/u"}}});
        let transport = ScriptedTransport::new()
            .reply(&ok(record))
            .fail(TransportError::Timeout("slow".to_string()));
        let mut client = client(transport);

        let err = client.get_related_records("requisition", 7, &[]).unwrap_err();
        assert!(matches!(err, ApiError::NoRelatedRecords { id: 7, .. }));
    }

    #[test]
    fn related_records_with_names_key_by_given_name() {
        let transport = ScriptedTransport::new()
            .reply(&ok(json!({"users": []})))
            .reply(&not_found("attachment"));
        let mut client = client(transport);

        let related = client.get_related_records("requisition", 7, &["user", "attachment"]).unwrap();

        assert_eq!(related.len(), 1);
        assert_eq!(related[0].0, "user");
        assert_eq!(urls(&client)[1], format!("{HOST}/object/requisition/7/attachment"));
    }

    #[test]
    fn related_records_require_relationship_urls() {
        let transport = ScriptedTransport::new().reply(&ok(json!({"requisition": {"id": 7}})));
        let mut client = client(transport);

        let err = client.get_related_records("requisition", 7, &[]).unwrap_err();
        assert!(matches!(err, ApiError::MissingField { ref field, .. } if field == "relationshipUrls"));
    }
}
