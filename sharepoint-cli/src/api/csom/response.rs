//! Response correlation
//!
//! A CSOM response is a JSON array. The first element is request metadata
//! (versions, trace id and a possible `ErrorInfo` fault). After it, a bare
//! integer announces an action id and the element that follows it, unless it
//! is another integer, is that action's result.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::batch::ActionRef;
use crate::api::error::{Error, Result, ServerFault};
use crate::api::metadata::{DescriptorProvider, ModelDescriptor, map_fragment};
use crate::api::query::Dialect;

fn parse_array(body: &[u8]) -> Result<Vec<Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Array(elements)) => Ok(elements),
        Ok(_) => Err(Error::parse("CSOM response is not a JSON array")),
        Err(e) => Err(Error::parse(format!("CSOM response is not JSON: {}", e))),
    }
}

/// Integers that fit an id are always treated as id markers
fn as_id(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

/// Single left-to-right scan over everything after the metadata element
fn scan(elements: &[Value]) -> BTreeMap<u32, Value> {
    let mut results = BTreeMap::new();
    let mut pending: Option<u32> = None;

    for element in elements.iter().skip(1) {
        match as_id(element) {
            Some(id) => {
                if let Some(previous) = pending.replace(id) {
                    log::trace!("Action {} produced no result", previous);
                }
            }
            None => match pending.take() {
                Some(id) => {
                    results.entry(id).or_insert_with(|| element.clone());
                }
                None => log::debug!("Ignoring response element with no preceding id"),
            },
        }
    }

    results
}

/// Result fragment for action `id`, if the response carries one
pub fn correlate(body: &[u8], id: u32) -> Result<Option<Value>> {
    Ok(correlate_all(body)?.remove(&id))
}

/// Every `id -> fragment` pair in the response
pub fn correlate_all(body: &[u8]) -> Result<BTreeMap<u32, Value>> {
    let elements = parse_array(body)?;
    Ok(scan(&elements))
}

/// `ErrorInfo` from the metadata element, when it is set
pub fn fault(metadata: &Value) -> Option<ServerFault> {
    let info = metadata.get("ErrorInfo").filter(|v| !v.is_null())?;
    let text = |key: &str| info.get(key).and_then(Value::as_str).map(str::to_string);

    Some(ServerFault {
        message: text("ErrorMessage").unwrap_or_else(|| "unknown server error".to_string()),
        code: info.get("ErrorCode").and_then(Value::as_i64),
        type_name: text("ErrorTypeName"),
        value: text("ErrorValue"),
        correlation_id: text("TraceCorrelationId")
            .or_else(|| metadata.get("TraceCorrelationId").and_then(Value::as_str).map(str::to_string)),
    })
}

/// Correlated response to one executed batch
#[derive(Debug, Clone, PartialEq)]
pub struct CsomResponse {
    metadata: Value,
    results: BTreeMap<u32, Value>,
}

impl CsomResponse {
    /// Parse a response, reporting a server fault before anything else
    pub fn parse(body: &[u8]) -> Result<Self> {
        let elements = parse_array(body)?;
        let metadata = elements
            .first()
            .cloned()
            .ok_or_else(|| Error::parse("CSOM response array is empty"))?;

        if let Some(fault) = fault(&metadata) {
            log::warn!("CSOM request failed: {}", fault);
            return Err(fault.into());
        }

        let results = scan(&elements);
        log::debug!(
            "Correlated CSOM response: {} results (ids {:?})",
            results.len(),
            results.keys().collect::<Vec<_>>()
        );
        Ok(Self { metadata, results })
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn schema_version(&self) -> Option<&str> {
        self.metadata.get("SchemaVersion").and_then(Value::as_str)
    }

    pub fn library_version(&self) -> Option<&str> {
        self.metadata.get("LibraryVersion").and_then(Value::as_str)
    }

    pub fn trace_correlation_id(&self) -> Option<&str> {
        self.metadata.get("TraceCorrelationId").and_then(Value::as_str)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.results.keys().copied()
    }

    pub fn get(&self, id: u32) -> Option<&Value> {
        self.results.get(&id)
    }

    pub fn result(&self, action: ActionRef) -> Option<&Value> {
        self.get(action.id())
    }

    /// Like `get`, but a missing result is an error
    pub fn require(&self, id: u32) -> Result<&Value> {
        self.get(id).ok_or(Error::MissingResult { id })
    }

    /// Map the result of `id` onto `model` and deserialize it.
    /// CSOM payloads use SharePoint wire names.
    pub fn get_as<T: DeserializeOwned>(
        &self,
        id: u32,
        model: &ModelDescriptor,
        provider: &dyn DescriptorProvider,
    ) -> Result<Option<T>> {
        let Some(fragment) = self.get(id) else {
            return Ok(None);
        };
        let record = map_fragment(fragment, model, Dialect::SharePointRest, provider)
            .map_err(|e| Error::mapping(format!("action {}", id), e))?;
        record
            .into_typed()
            .map(Some)
            .map_err(|e| Error::mapping(format!("action {}", id), e))
    }

    /// Deserialize the raw fragment of `id` without descriptor mapping
    pub fn get_raw<T: DeserializeOwned>(&self, id: u32) -> Result<Option<T>> {
        self.get(id)
            .map(|fragment| {
                serde_json::from_value(fragment.clone())
                    .map_err(|e| Error::parse(format!("result of action {}: {}", id, e)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::metadata::DescriptorRegistry;
    use serde::Deserialize;
    use serde_json::json;

    const EXAMPLE: &str = r#"[{"SchemaVersion":"15.0.0.0","LibraryVersion":"16.0.24817.12000","ErrorInfo":null,"TraceCorrelationId":"b2d1c0a1-0000-4000-9000-000000000001"},7,{"Id":"42"},9,{"Title":"Home"}]"#;

    #[test]
    fn test_correlate_finds_fragments_by_id() {
        let body = EXAMPLE.as_bytes();
        assert_eq!(correlate(body, 7).unwrap(), Some(json!({"Id": "42"})));
        assert_eq!(correlate(body, 9).unwrap(), Some(json!({"Title": "Home"})));
        assert_eq!(correlate(body, 3).unwrap(), None);
    }

    #[test]
    fn test_correlation_is_idempotent() {
        let body = EXAMPLE.as_bytes();
        assert_eq!(correlate(body, 9).unwrap(), correlate(body, 9).unwrap());
        assert_eq!(correlate_all(body).unwrap(), correlate_all(body).unwrap());
    }

    #[test]
    fn test_number_followed_by_number_has_no_result() {
        let body = br#"[{}, 2, 4, {"Title":"x"}, 6]"#;
        let all = correlate_all(body).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all.get(&4), Some(&json!({"Title": "x"})));
        assert!(!all.contains_key(&2));
        assert!(!all.contains_key(&6));
    }

    #[test]
    fn test_non_id_values_are_fragments() {
        let body = br#"[{}, 3, "plain string", 5, true, 8, -1]"#;
        let all = correlate_all(body).unwrap();
        assert_eq!(all.get(&3), Some(&json!("plain string")));
        assert_eq!(all.get(&5), Some(&json!(true)));
        assert_eq!(all.get(&8), Some(&json!(-1)));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        assert!(matches!(correlate(b"{oops", 1), Err(Error::Parse(_))));
        assert!(matches!(correlate(br#"{"a":1}"#, 1), Err(Error::Parse(_))));
        assert!(matches!(CsomResponse::parse(b"[]"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_fault_is_reported_before_results() {
        let body = br#"[{"SchemaVersion":"15.0.0.0","ErrorInfo":{"ErrorMessage":"Item does not exist.","ErrorValue":null,"TraceCorrelationId":"abc","ErrorCode":-2130575338,"ErrorTypeName":"System.ArgumentException"},"TraceCorrelationId":"abc"},4,{"Title":"ignored"}]"#;
        match CsomResponse::parse(body) {
            Err(Error::ServerFault(fault)) => {
                assert_eq!(fault.message, "Item does not exist.");
                assert_eq!(fault.code, Some(-2130575338));
                assert_eq!(fault.type_name.as_deref(), Some("System.ArgumentException"));
                assert_eq!(fault.correlation_id.as_deref(), Some("abc"));
            }
            other => panic!("expected server fault, got {:?}", other),
        }
    }

    #[test]
    fn test_response_accessors() {
        let response = CsomResponse::parse(EXAMPLE.as_bytes()).unwrap();
        assert_eq!(response.schema_version(), Some("15.0.0.0"));
        assert_eq!(
            response.trace_correlation_id(),
            Some("b2d1c0a1-0000-4000-9000-000000000001")
        );
        assert_eq!(response.ids().collect::<Vec<_>>(), vec![7, 9]);
        assert!(response.require(9).is_ok());
        assert!(matches!(response.require(3), Err(Error::MissingResult { id: 3 })));
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct ListInfo {
        title: String,
        item_count: i64,
    }

    #[test]
    fn test_typed_results_use_descriptor_mapping() {
        let body = br#"[{"SchemaVersion":"15.0.0.0","ErrorInfo":null},12,{"_ObjectType_":"SP.List","Title":"Documents","ItemCount":14,"Custom":"x"},13,{"_ObjectType_":"SP.List","Title":"Bad","ItemCount":"many"}]"#;
        let response = CsomResponse::parse(body).unwrap();
        let registry = DescriptorRegistry::builtin();
        let list = registry.describe("List").unwrap();

        let info: ListInfo = response.get_as(12, list, &registry).unwrap().unwrap();
        assert_eq!(info.title, "Documents");
        assert_eq!(info.item_count, 14);

        assert!(response.get_as::<ListInfo>(99, list, &registry).unwrap().is_none());

        match response.get_as::<ListInfo>(13, list, &registry) {
            Err(Error::Mapping { context, source }) => {
                assert_eq!(context, "action 13");
                assert_eq!(source.field, "ItemCount");
            }
            other => panic!("expected mapping error, got {:?}", other),
        }
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct ListDates {
        id: uuid::Uuid,
        created: chrono::DateTime<chrono::Utc>,
    }

    #[test]
    fn test_typed_results_accept_wire_dates_and_guids() {
        let body = br#"[{"SchemaVersion":"15.0.0.0","ErrorInfo":null},5,{"_ObjectType_":"SP.List","Id":"\/Guid(8b2f6f2c-5d3a-4c8e-9a51-0f2b7c1d9e44)\/","Title":"Documents","Created":"\/Date(2024,0,15,8,30,0,0)\/"}]"#;
        let response = CsomResponse::parse(body).unwrap();
        let registry = DescriptorRegistry::builtin();
        let list = registry.describe("List").unwrap();

        let dates: ListDates = response.get_as(5, list, &registry).unwrap().unwrap();
        assert_eq!(dates.id, uuid::uuid!("8b2f6f2c-5d3a-4c8e-9a51-0f2b7c1d9e44"));
        assert_eq!(dates.created.to_rfc3339(), "2024-01-15T08:30:00+00:00");
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    #[allow(dead_code)]
    struct NumericTitle {
        title: i64,
    }

    #[test]
    fn test_typed_mismatch_names_field() {
        let body = br#"[{"SchemaVersion":"15.0.0.0","ErrorInfo":null},6,{"_ObjectType_":"SP.List","Title":"Documents"}]"#;
        let response = CsomResponse::parse(body).unwrap();
        let registry = DescriptorRegistry::builtin();
        let list = registry.describe("List").unwrap();

        match response.get_as::<NumericTitle>(6, list, &registry) {
            Err(Error::Mapping { context, source }) => {
                assert_eq!(context, "action 6");
                assert_eq!(source.field, "Title");
                assert_eq!(source.expected, "i64");
            }
            other => panic!("expected mapping error, got {:?}", other),
        }
    }
}
