//! Typed parameter values carried by CSOM methods, constructors and property sets

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Null,
    String(String),
    Guid(Uuid),
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    DateTime(DateTime<Utc>),
    /// Server-side enum, sent by numeric value
    Enum(i64),
    Array(Vec<Parameter>),
    /// Reference to an object path declared in the same batch
    ObjectPath(u32),
    /// Inline value object, e.g. a lookup value
    Object {
        type_id: Uuid,
        properties: Vec<(String, Parameter)>,
    },
}

impl Parameter {
    /// Value of the `Type` attribute; `None` for kinds identified another way
    pub fn type_name(&self) -> Option<&'static str> {
        match self {
            Parameter::Null => Some("Null"),
            Parameter::String(_) => Some("String"),
            Parameter::Guid(_) => Some("Guid"),
            Parameter::Boolean(_) => Some("Boolean"),
            Parameter::Int32(_) => Some("Int32"),
            Parameter::Int64(_) => Some("Int64"),
            Parameter::Double(_) => Some("Double"),
            Parameter::DateTime(_) => Some("DateTime"),
            Parameter::Enum(_) => Some("Enum"),
            Parameter::Array(_) => Some("Array"),
            Parameter::ObjectPath(_) | Parameter::Object { .. } => None,
        }
    }

    /// Text content for scalar kinds
    pub(crate) fn scalar_text(&self) -> Option<String> {
        match self {
            Parameter::String(s) => Some(s.clone()),
            Parameter::Guid(g) => Some(format!("{{{}}}", g)),
            Parameter::Boolean(b) => Some(b.to_string()),
            Parameter::Int32(i) => Some(i.to_string()),
            Parameter::Int64(i) => Some(i.to_string()),
            Parameter::Enum(i) => Some(i.to_string()),
            Parameter::Double(f) => Some(double_text(*f)),
            Parameter::DateTime(dt) => Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Parameter::Null
            | Parameter::Array(_)
            | Parameter::ObjectPath(_)
            | Parameter::Object { .. } => None,
        }
    }

    /// Every object path id referenced by this value, depth first
    pub fn referenced_paths(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        self.collect_paths(&mut ids);
        ids
    }

    fn collect_paths(&self, ids: &mut Vec<u32>) {
        match self {
            Parameter::ObjectPath(id) => ids.push(*id),
            Parameter::Array(items) => items.iter().for_each(|p| p.collect_paths(ids)),
            Parameter::Object { properties, .. } => {
                properties.iter().for_each(|(_, p)| p.collect_paths(ids))
            }
            _ => {}
        }
    }
}

fn double_text(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else {
        value.to_string()
    }
}

impl From<&str> for Parameter {
    fn from(value: &str) -> Self {
        Parameter::String(value.to_string())
    }
}

impl From<String> for Parameter {
    fn from(value: String) -> Self {
        Parameter::String(value)
    }
}

impl From<Uuid> for Parameter {
    fn from(value: Uuid) -> Self {
        Parameter::Guid(value)
    }
}

impl From<bool> for Parameter {
    fn from(value: bool) -> Self {
        Parameter::Boolean(value)
    }
}

impl From<i32> for Parameter {
    fn from(value: i32) -> Self {
        Parameter::Int32(value)
    }
}

impl From<i64> for Parameter {
    fn from(value: i64) -> Self {
        Parameter::Int64(value)
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Double(value)
    }
}

impl From<DateTime<Utc>> for Parameter {
    fn from(value: DateTime<Utc>) -> Self {
        Parameter::DateTime(value)
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Parameter::Null)
    }
}
