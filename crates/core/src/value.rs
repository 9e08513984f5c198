//! Scalar values stored in metadata tree leaves
//!
//! ## Value Model
//!
//! - Null, Text, Number, Date, Choice, Blob
//! - `Null` is an explicit placeholder and fits every scalar kind
//! - Every other variant fits exactly one [`ScalarKind`]
//! - `Blob` carries compound payloads (for example a domain value list) and
//!   is copied by value like every other variant

use crate::schema::ScalarKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scalar payload of a tree leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Present but empty placeholder
    #[default]
    Null,
    /// Free text
    Text(String),
    /// Numeric value
    Number(f64),
    /// Calendar date
    Date(NaiveDate),
    /// Selected entry of an enumerated list
    Choice(String),
    /// Opaque structured payload
    Blob(serde_json::Value),
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Text(_) => "Text",
            Value::Number(_) => "Number",
            Value::Date(_) => "Date",
            Value::Choice(_) => "Choice",
            Value::Blob(_) => "Blob",
        }
    }

    /// Scalar kind carried by this value (`None` for `Null`)
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(ScalarKind::Text),
            Value::Number(_) => Some(ScalarKind::Number),
            Value::Date(_) => Some(ScalarKind::Date),
            Value::Choice(_) => Some(ScalarKind::Choice),
            Value::Blob(_) => Some(ScalarKind::FreeForm),
        }
    }

    /// Whether this value may be stored under an attribute of `kind`
    pub fn fits(&self, kind: ScalarKind) -> bool {
        self.kind().map_or(true, |k| k == kind)
    }

    /// Check if this is the null placeholder
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text or choice content as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Date content
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Blob content
    pub fn as_blob(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl ScalarKind {
    /// Canonical value written by `init_default` for this kind
    pub fn default_value(self) -> Value {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
