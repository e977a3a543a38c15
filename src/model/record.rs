//! Schema-bound record instances
//!
//! A record owns the coerced values of one logical entity. All writes
//! go through `set`, which routes raw input through the declared
//! type's coercion; reads go through `get`, which applies any
//! compiled getter override. Validation is a full scan: every field
//! and every rule runs regardless of earlier failures.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::coerce;
use super::errors::ValidationError;
use super::record_set::RecordSet;
use super::typedef::{FieldType, ModelSchema, TypeDefinition};
use super::value::{FieldValue, Input, SharedRecord};

/// A schema-bound typed object instance.
///
/// Cloning is shallow: nested records and record sets are shared
/// handles, so a clone aliases the same nested instances as the
/// original.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<ModelSchema>,
    values: HashMap<String, FieldValue>,
}

impl Record {
    /// Constructs a record from raw JSON input.
    ///
    /// Every declared field is routed through [`set`](Self::set) in
    /// schema order, with the raw object's entry for that field or
    /// `Absent` when missing, so defaults apply identically. Unknown
    /// raw keys are silently ignored. Non-object input behaves as an
    /// empty object.
    pub fn new(schema: Arc<ModelSchema>, raw: Value) -> Record {
        let mut record = Record {
            schema: Arc::clone(&schema),
            values: HashMap::with_capacity(schema.field_count()),
        };
        let raw = match raw {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let names: Vec<String> = schema.fields().map(|(n, _)| n.to_string()).collect();
        for name in names {
            let input: Input = raw.get(&name).cloned().into();
            record.set(&name, input);
        }
        record
    }

    /// Constructs a record with no input; every field gets its default.
    pub fn empty(schema: Arc<ModelSchema>) -> Record {
        Record::new(schema, Value::Null)
    }

    /// Constructs a record behind a shared handle.
    pub fn shared(schema: Arc<ModelSchema>, raw: Value) -> SharedRecord {
        Rc::new(RefCell::new(Record::new(schema, raw)))
    }

    /// Builds a record from its persisted representation, mapping
    /// persisted column names back to field names (the structural
    /// inverse of [`to_db`](Self::to_db)). Columns not bound by the
    /// schema are ignored.
    pub fn from_persisted(schema: Arc<ModelSchema>, raw: Value) -> Record {
        let mut mapped = Map::new();
        if let Value::Object(columns) = raw {
            for (column, value) in columns {
                if let Some(field) = schema.field_for_column(&column) {
                    mapped.insert(field.to_string(), value);
                }
            }
        }
        Record::new(schema, Value::Object(mapped))
    }

    /// The schema this record is bound to.
    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    /// Returns the current value of a field.
    ///
    /// When the schema compiled a getter override for the field, the
    /// override's result is returned given the raw stored value.
    /// Unknown keys yield `None`.
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        let definition = self.schema.field(key)?;
        let stored = self.values.get(key).cloned().unwrap_or(FieldValue::Null);
        Some(match definition.getter() {
            Some(getter) => getter(self, &stored),
            None => stored,
        })
    }

    /// Writes a field, coercing the raw input by the declared type.
    ///
    /// Unknown keys are a no-op. A compiled setter override runs
    /// instead of coercion: its result is stored verbatim, `None`
    /// stores the field default, and the override may write sibling
    /// fields through the record handle.
    pub fn set(&mut self, key: &str, input: impl Into<Input>) -> &mut Self {
        let input = input.into();
        let schema = Arc::clone(&self.schema);
        let Some(definition) = schema.field(key) else {
            return self;
        };
        let default = definition.default_value().clone();

        let stored = match definition.setter() {
            Some(setter) => setter(self, &input, &default).unwrap_or(default),
            None => coerce_value(definition, &input, default),
        };
        self.values.insert(key.to_string(), stored);
        self
    }

    /// Validates every field against its compiled rules.
    ///
    /// Nested records and record sets validate recursively; their
    /// failures are re-keyed as `"{field}_{nestedKey}"` and merged.
    /// The scan never aborts early: a failing field never hides other
    /// failing fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        for (name, definition) in self.schema.fields() {
            let value = self.get(name).unwrap_or(FieldValue::Null);

            match &value {
                FieldValue::Record(nested) => {
                    if let Err(nested_errors) = nested.borrow().validate() {
                        errors.merge_prefixed(name, nested_errors);
                    }
                }
                FieldValue::Set(nested) => {
                    if let Err(nested_errors) = nested.validate() {
                        errors.merge_prefixed(name, nested_errors);
                    }
                }
                _ => {}
            }

            for rule in definition.rules() {
                if let Err(failure) = rule.apply(self, &value, definition.default_value()) {
                    errors.push(name, failure);
                }
            }
        }
        errors.into_result()
    }

    /// Renders the persisted representation: output keyed by
    /// persisted column names, fields with an omitted column absent,
    /// nested values delegating to their own `to_db`.
    pub fn to_db(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, definition) in self.schema.fields() {
            let Some(column) = definition.column().resolve(name) else {
                continue;
            };
            let value = self.get(name).unwrap_or(FieldValue::Null);
            out.insert(column.to_string(), value.db_value());
        }
        out
    }

    /// Renders field-keyed output, recursing into nested values.
    pub fn get_data(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, _) in self.schema.fields() {
            let value = self.get(name).unwrap_or(FieldValue::Null);
            out.insert(name.to_string(), value.data_value());
        }
        out
    }

    /// The designated primary-key field name, if any.
    pub fn primary_key(&self) -> Option<&str> {
        self.schema.primary_key()
    }

    /// The current value of the primary-key field, if one is
    /// designated.
    pub fn primary_key_value(&self) -> Option<FieldValue> {
        self.get(self.schema.primary_key()?)
    }
}

/// Coercion dispatch for fields without a setter override.
fn coerce_value(definition: &TypeDefinition, input: &Input, default: FieldValue) -> FieldValue {
    match definition.field_type() {
        FieldType::Model(nested) => coerce_model(nested, input, default),
        FieldType::Custom(coerce_fn) => coerce_fn(input, &default),
        primitive => match input {
            Input::Json(raw) => {
                coerce::coerce_json(primitive, definition.allowed_values(), raw).unwrap_or(default)
            }
            _ => default,
        },
    }
}

/// Nested-schema coercion: an existing instance of the declared
/// schema is kept as-is (aliased); array input builds a nested record
/// set; object input builds a nested record; anything else falls back
/// to the default.
fn coerce_model(nested: &Arc<ModelSchema>, input: &Input, default: FieldValue) -> FieldValue {
    match input {
        Input::Record(record) if Arc::ptr_eq(record.borrow().schema(), nested) => {
            FieldValue::Record(Rc::clone(record))
        }
        Input::Set(set) if Arc::ptr_eq(set.schema(), nested) => FieldValue::Set(set.clone()),
        Input::Json(raw @ Value::Array(_)) => {
            FieldValue::Set(RecordSet::with_items(Arc::clone(nested), raw.clone()))
        }
        Input::Json(raw @ Value::Object(_)) => {
            FieldValue::Record(Record::shared(Arc::clone(nested), raw.clone()))
        }
        _ => default,
    }
}
