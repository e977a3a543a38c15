//! Canonical field values and raw input values
//!
//! `FieldValue` is what a record stores after coercion; `Input` is
//! what `Record::set` accepts before coercion. The two are kept
//! separate so that "no value supplied" (`Input::Absent`) stays
//! distinguishable from an explicit JSON null.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use super::record::Record;
use super::record_set::RecordSet;

/// A record under shared ownership.
///
/// Records are aliased intentionally: the same instance may live in
/// several record sets and nested fields at once, and mutation through
/// one handle is visible through all of them. The engine is
/// single-threaded, so `Rc<RefCell<..>>` is the ownership model.
pub type SharedRecord = Rc<RefCell<Record>>;

/// Canonical typed value of one record field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// No value; also the implicit default.
    Null,
    /// UTF-8 string.
    Str(String),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Point in time, stored in UTC.
    Date(DateTime<Utc>),
    /// JSON array, elements kept verbatim.
    Array(Vec<Value>),
    /// JSON object, kept verbatim.
    Object(Map<String, Value>),
    /// Nested record (shared handle).
    Record(SharedRecord),
    /// Nested record set.
    Set(RecordSet),
}

impl FieldValue {
    /// Builds the closest canonical value for an arbitrary JSON value.
    ///
    /// Used by the `mixed` type, which accepts anything verbatim.
    pub fn from_json(raw: &Value) -> FieldValue {
        match raw {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Int(i)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => FieldValue::Str(s.clone()),
            Value::Array(items) => FieldValue::Array(items.clone()),
            Value::Object(map) => FieldValue::Object(map.clone()),
        }
    }

    /// Renders the value as field-keyed output.
    ///
    /// Nested records and sets delegate to their own `get_data()`.
    /// Dates render as RFC 3339 strings.
    pub fn data_value(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Date(dt) => Value::String(dt.to_rfc3339()),
            FieldValue::Array(items) => Value::Array(items.clone()),
            FieldValue::Object(map) => Value::Object(map.clone()),
            FieldValue::Record(record) => Value::Object(record.borrow().get_data()),
            FieldValue::Set(set) => {
                Value::Array(set.get_data().into_iter().map(Value::Object).collect())
            }
        }
    }

    /// Renders the value as persisted (column-keyed) output.
    ///
    /// Differs from [`data_value`](Self::data_value) only for nested
    /// values, which delegate to their own `to_db()`.
    pub fn db_value(&self) -> Value {
        match self {
            FieldValue::Record(record) => Value::Object(record.borrow().to_db()),
            FieldValue::Set(set) => {
                Value::Array(set.to_db().into_iter().map(Value::Object).collect())
            }
            other => other.data_value(),
        }
    }

    /// Returns the value kind name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Str(_) => "string",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Date(_) => "date",
            FieldValue::Array(_) => "array",
            FieldValue::Object(_) => "object",
            FieldValue::Record(_) => "record",
            FieldValue::Set(_) => "record_set",
        }
    }

    /// True for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Str(a), FieldValue::Str(b)) => a == b,
            (FieldValue::Int(a), FieldValue::Int(b)) => a == b,
            (FieldValue::Float(a), FieldValue::Float(b)) => a == b,
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
            (FieldValue::Date(a), FieldValue::Date(b)) => a == b,
            (FieldValue::Array(a), FieldValue::Array(b)) => a == b,
            (FieldValue::Object(a), FieldValue::Object(b)) => a == b,
            // Records compare by identity, not structure: two handles are
            // equal only when they alias the same instance.
            (FieldValue::Record(a), FieldValue::Record(b)) => Rc::ptr_eq(a, b),
            (FieldValue::Set(a), FieldValue::Set(b)) => a == b,
            _ => false,
        }
    }
}

/// Raw input accepted by `Record::set` and the record-set mutators.
#[derive(Debug, Clone)]
pub enum Input {
    /// No value supplied. Resolves to the field default.
    Absent,
    /// An arbitrary JSON value.
    Json(Value),
    /// An existing record instance (kept as-is when the schema matches).
    Record(SharedRecord),
    /// An existing record set (kept as-is when the schema matches).
    Set(RecordSet),
}

impl Input {
    /// True for [`Input::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, Input::Absent)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Json(value)
    }
}

impl From<Option<Value>> for Input {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(v) => Input::Json(v),
            None => Input::Absent,
        }
    }
}

impl From<SharedRecord> for Input {
    fn from(record: SharedRecord) -> Self {
        Input::Record(record)
    }
}

impl From<RecordSet> for Input {
    fn from(set: RecordSet) -> Self {
        Input::Set(set)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Json(Value::String(value.to_string()))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Json(Value::String(value))
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Json(Value::Number(value.into()))
    }
}

impl From<f64> for Input {
    fn from(value: f64) -> Self {
        Input::Json(Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Json(Value::Bool(value))
    }
}

impl From<FieldValue> for Input {
    /// Feeds a canonical value back through the raw-input path.
    ///
    /// Shared values stay shared; scalar values travel through their
    /// JSON rendering, which the coercion table maps back onto an
    /// equal canonical value.
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Record(record) => Input::Record(record),
            FieldValue::Set(set) => Input::Set(set),
            other => Input::Json(other.data_value()),
        }
    }
}
