//! Mapping wire-format JSON fragments onto model fields
//!
//! Wire names are translated to model names through the descriptor table,
//! values are checked against the declared field kind, and anything the
//! table does not declare lands in the record's overflow map.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::DescriptorProvider;
use super::models::{FieldDescriptor, FieldKind, ModelDescriptor};
use crate::api::error::MappingError;
use crate::api::query::Dialect;

/// One mapped response object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Declared fields, keyed by model field name
    pub fields: Map<String, Value>,
    /// Undeclared properties, keyed by wire name
    pub overflow: BTreeMap<String, Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Undeclared property by wire name
    pub fn extra(&self, wire_name: &str) -> Option<&Value> {
        self.overflow.get(wire_name)
    }

    /// Flatten into one JSON object; declared fields win over overflow keys
    pub fn into_json(self) -> Value {
        let mut object = Map::new();
        for (key, value) in self.overflow {
            object.insert(key, value);
        }
        for (key, value) in self.fields {
            object.insert(key, value);
        }
        Value::Object(object)
    }

    /// Deserialize into a caller type. Types that want overflow properties can
    /// declare a `#[serde(flatten)]` map.
    ///
    /// A rejected value is reported with its path (`Author.Title`) and the
    /// type the caller declared for it.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, MappingError> {
        serde_path_to_error::deserialize(self.into_json()).map_err(|e| {
            let path = e.path().to_string();
            typed_error::<T>(path, &e.into_inner().to_string())
        })
    }
}

/// Split a serde message such as `invalid type: string "x", expected i64`
/// into field, expected type and detail
fn typed_error<T>(path: String, message: &str) -> MappingError {
    let field = if path != "." {
        path
    } else {
        missing_field(message)
            .map(str::to_string)
            .unwrap_or_else(|| "<record>".to_string())
    };

    match message.rsplit_once(", expected ") {
        Some((detail, expected)) => MappingError::new(field, expected, detail),
        None if message.starts_with("missing field") => {
            MappingError::new(field, "a value", message)
        }
        None => MappingError::new(field, std::any::type_name::<T>(), message),
    }
}

/// Field name from serde's "missing field `Name`"
fn missing_field(message: &str) -> Option<&str> {
    message
        .strip_prefix("missing field `")?
        .split('`')
        .next()
}

/// Keys that carry protocol metadata rather than model data
fn is_metadata_key(key: &str) -> bool {
    key.starts_with("@odata.")
        || key.starts_with("odata.")
        || key.contains("@odata.")
        || key == "__metadata"
        || key == "__deferred"
        || key.starts_with("_Object")
}

/// Map one JSON object onto `model` using the wire names of `dialect`
pub fn map_fragment(
    fragment: &Value,
    model: &ModelDescriptor,
    dialect: Dialect,
    provider: &dyn DescriptorProvider,
) -> Result<Record, MappingError> {
    let object = fragment
        .as_object()
        .ok_or_else(|| MappingError::new(model.name.clone(), "object", found(fragment)))?;

    let mut record = Record::default();

    for (key, value) in object {
        if is_metadata_key(key) {
            continue;
        }

        let Some(field) = model.by_wire_name(dialect, key) else {
            record.overflow.insert(key.clone(), value.clone());
            continue;
        };

        // SharePoint verbose: navigation not loaded
        if value.get("__deferred").is_some() {
            continue;
        }

        let value = normalize_wire_value(field, unwrap_verbose_results(field, value));
        check_kind(field, &value)?;
        let mapped = map_nested(field, &value, dialect, provider)?;
        record.fields.insert(field.name.clone(), mapped);
    }

    Ok(record)
}

/// Map and deserialize one fragment into `T`
pub fn deserialize_fragment<T: DeserializeOwned>(
    fragment: &Value,
    model: &ModelDescriptor,
    dialect: Dialect,
    provider: &dyn DescriptorProvider,
) -> Result<T, MappingError> {
    map_fragment(fragment, model, dialect, provider)?.into_typed()
}

/// SharePoint verbose wraps collections as `{"results": [...]}`
fn unwrap_verbose_results<'a>(field: &FieldDescriptor, value: &'a Value) -> &'a Value {
    if field.kind == FieldKind::Collection {
        if let Some(results) = value.get("results").filter(|r| r.is_array()) {
            return results;
        }
    }
    value
}

/// Rewrite CSOM and verbose encodings to the canonical text the field kind
/// expects: `/Date(...)/` becomes RFC 3339 UTC and `/Guid(...)/` a bare GUID.
/// Anything unrecognised is left for `check_kind` to reject.
fn normalize_wire_value<'a>(field: &FieldDescriptor, value: &'a Value) -> Cow<'a, Value> {
    let Some(text) = value.as_str() else {
        return Cow::Borrowed(value);
    };

    let normalized = match field.kind {
        FieldKind::DateTime => unwrap_marker(text, "/Date(")
            .and_then(parse_wire_date)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        FieldKind::Guid => unwrap_marker(text, "/Guid(")
            .filter(|inner| Uuid::parse_str(inner).is_ok())
            .map(str::to_string),
        _ => None,
    };

    match normalized {
        Some(text) => Cow::Owned(Value::String(text)),
        None => Cow::Borrowed(value),
    }
}

fn unwrap_marker<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.strip_prefix(prefix)?.strip_suffix(")/")
}

/// `y,m,d[,h,mi,s,ms]` with a zero-based month (CSOM), or epoch
/// milliseconds with an optional `+hhmm` offset (verbose OData)
fn parse_wire_date(inner: &str) -> Option<DateTime<Utc>> {
    if !inner.contains(',') {
        let end = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map_or(inner.len(), |(i, _)| i);
        return inner[..end]
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis);
    }

    let parts = inner
        .split(',')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    let (date, time) = match parts.as_slice() {
        [y, m, d, time @ ..] if time.len() <= 4 => ((*y, *m, *d), time),
        _ => return None,
    };
    let at = |i: usize| time.get(i).copied().unwrap_or(0);

    NaiveDate::from_ymd_opt(i32::try_from(date.0).ok()?, date.1 + 1, date.2)?
        .and_hms_milli_opt(at(0), at(1), at(2), at(3))
        .map(|dt| dt.and_utc())
}

/// Expanded navigation values are mapped through the target model's table
fn map_nested(
    field: &FieldDescriptor,
    value: &Value,
    dialect: Dialect,
    provider: &dyn DescriptorProvider,
) -> Result<Value, MappingError> {
    let target = match field.target.as_deref().and_then(|t| provider.describe(t)) {
        Some(target) if field.expandable => target,
        _ => return Ok(value.clone()),
    };

    let nested_err = |e: MappingError| MappingError {
        field: format!("{}.{}", field.name, e.field),
        ..e
    };

    match value {
        Value::Object(_) => Ok(map_fragment(value, target, dialect, provider)
            .map_err(nested_err)?
            .into_json()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) => map_fragment(item, target, dialect, provider)
                    .map(Record::into_json)
                    .map_err(nested_err),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Validate the JSON shape of a value against the declared field kind
fn check_kind(field: &FieldDescriptor, value: &Value) -> Result<(), MappingError> {
    if value.is_null() {
        return Ok(());
    }

    let ok = match field.kind {
        FieldKind::String => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::DateTime => value
            .as_str()
            .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
        FieldKind::Guid => value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()),
        FieldKind::Lookup => value.is_object() || value.is_number() || value.is_string(),
        FieldKind::Collection => value.is_array(),
        FieldKind::Complex => value.is_object(),
    };

    if ok {
        Ok(())
    } else {
        Err(MappingError::new(
            field.name.clone(),
            field.kind.as_str(),
            found(value),
        ))
    }
}

fn found(value: &Value) -> String {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "floating point number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    match value {
        Value::String(s) => format!("found {} '{}'", kind, s),
        _ => format!("found {}", kind),
    }
}
