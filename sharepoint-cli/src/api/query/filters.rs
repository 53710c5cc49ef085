//! Predicate trees and literal values for `$filter`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::metadata::FieldKind;

/// Comparison operators supported by both OData dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

impl ComparisonOp {
    pub fn as_odata(&self) -> &'static str {
        match self {
            ComparisonOp::Equal => "eq",
            ComparisonOp::NotEqual => "ne",
            ComparisonOp::GreaterThan => "gt",
            ComparisonOp::GreaterOrEqual => "ge",
            ComparisonOp::LessThan => "lt",
            ComparisonOp::LessOrEqual => "le",
        }
    }
}

/// Typed literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Guid(Uuid),
}

impl FilterValue {
    /// Parse command-line text into the literal type a field expects
    pub fn parse_for_kind(kind: FieldKind, text: &str) -> Result<Self, String> {
        if text.eq_ignore_ascii_case("null") {
            return Ok(FilterValue::Null);
        }

        match kind {
            FieldKind::String | FieldKind::Complex | FieldKind::Collection => {
                Ok(FilterValue::String(text.to_string()))
            }
            FieldKind::Integer | FieldKind::Lookup => text
                .parse::<i64>()
                .map(FilterValue::Int)
                .map_err(|_| format!("'{}' is not an integer", text)),
            FieldKind::Number => text
                .parse::<f64>()
                .map(FilterValue::Float)
                .map_err(|_| format!("'{}' is not a number", text)),
            FieldKind::Boolean => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(FilterValue::Bool(true)),
                "false" | "no" | "0" => Ok(FilterValue::Bool(false)),
                _ => Err(format!("'{}' is not a boolean", text)),
            },
            FieldKind::DateTime => parse_datetime(text)
                .map(FilterValue::DateTime)
                .ok_or_else(|| format!("'{}' is not an ISO-8601 date", text)),
            FieldKind::Guid => Uuid::parse_str(text)
                .map(FilterValue::Guid)
                .map_err(|_| format!("'{}' is not a GUID", text)),
        }
    }
}

/// Accepts full RFC 3339 timestamps and bare dates (midnight UTC)
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::String(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<i32> for FilterValue {
    fn from(value: i32) -> Self {
        FilterValue::Int(value as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        FilterValue::DateTime(value)
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        FilterValue::Guid(value)
    }
}

/// Boolean predicate over model fields
///
/// Field names are model-side names and may traverse expandable fields with
/// dots (`Author.Title`); the translator maps them to wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Comparison {
        field: String,
        op: ComparisonOp,
        value: FilterValue,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(field: impl Into<String>, op: ComparisonOp, value: impl Into<FilterValue>) -> Self {
        Predicate::Comparison {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, ComparisonOp::Equal, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, ComparisonOp::NotEqual, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, ComparisonOp::GreaterThan, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, ComparisonOp::GreaterOrEqual, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, ComparisonOp::LessThan, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, ComparisonOp::LessOrEqual, value)
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// All field names referenced by this predicate, left to right
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        collect_fields(self, &mut fields);
        fields
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

fn collect_fields<'a>(predicate: &'a Predicate, fields: &mut Vec<&'a str>) {
    match predicate {
        Predicate::Comparison { field, .. } => fields.push(field),
        Predicate::And(left, right) | Predicate::Or(left, right) => {
            collect_fields(left, fields);
            collect_fields(right, fields);
        }
        Predicate::Not(inner) => collect_fields(inner, fields),
    }
}
