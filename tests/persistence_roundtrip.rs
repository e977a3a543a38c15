//! Persisted-Shape Round-Trip Tests
//!
//! The persisted contract: toDb() output keys equal persisted column
//! names (defaulting to the field name), omitted columns never
//! appear, and fromPersisted() is the structural inverse of toDb().

use formadb::model::{FieldDescriptor, FieldValue, ModelSchema, Record, RecordSet};
use serde_json::{json, Value};
use std::sync::Arc;

// =============================================================================
// Helper Functions
// =============================================================================

fn renamed_schema() -> Arc<ModelSchema> {
    ModelSchema::builder("user")
        .field("id", FieldDescriptor::string().primary_key())
        .field("fullName", FieldDescriptor::string().column("full_name"))
        .field("age", FieldDescriptor::integer())
        .field("joined", FieldDescriptor::date())
        .build()
        .unwrap()
}

// =============================================================================
// Round-Trip Tests
// =============================================================================

/// fromPersisted(record.toDb()).getData() equals record.getData() for
/// a schema with no omitted columns.
#[test]
fn test_roundtrip_with_renamed_columns() {
    let record = Record::new(
        renamed_schema(),
        json!({
            "id": "u1",
            "fullName": "Ada Lovelace",
            "age": 36,
            "joined": "2024-05-01T10:30:00Z"
        }),
    );

    let restored = Record::from_persisted(renamed_schema(), Value::Object(record.to_db()));
    assert_eq!(restored.get_data(), record.get_data());
}

/// The persisted shape uses column names, the data shape field names.
#[test]
fn test_shapes_use_their_own_keys() {
    let record = Record::new(renamed_schema(), json!({ "fullName": "Ada" }));

    let db = record.to_db();
    assert!(db.contains_key("full_name"));
    assert!(!db.contains_key("fullName"));

    let data = record.get_data();
    assert!(data.contains_key("fullName"));
    assert!(!data.contains_key("full_name"));
}

/// Omitted columns are absent from persisted output and cannot be
/// restored from it.
#[test]
fn test_omitted_columns_never_roundtrip() {
    let schema = ModelSchema::builder("user")
        .field("name", FieldDescriptor::string())
        .field("sessionToken", FieldDescriptor::string().omit_column())
        .build()
        .unwrap();

    let record = Record::new(
        Arc::clone(&schema),
        json!({ "name": "ada", "sessionToken": "s3cret" }),
    );

    let db = record.to_db();
    assert!(!db.contains_key("sessionToken"));

    let restored = Record::from_persisted(schema, Value::Object(db));
    assert_eq!(restored.get("sessionToken"), Some(FieldValue::Null));
    assert_eq!(restored.get("name"), Some(FieldValue::Str("ada".into())));
}

/// Columns unknown to the schema are ignored on the way back in.
#[test]
fn test_unknown_columns_ignored() {
    let record = Record::from_persisted(
        renamed_schema(),
        json!({ "full_name": "Ada", "legacy_flag": true }),
    );
    assert_eq!(record.get("fullName"), Some(FieldValue::Str("Ada".into())));
    assert_eq!(record.get("legacy_flag"), None);
}

/// Dates survive the round trip through their RFC 3339 rendering.
#[test]
fn test_date_roundtrip() {
    let record = Record::new(
        renamed_schema(),
        json!({ "joined": "2024-05-01 10:30:00" }),
    );
    let restored = Record::from_persisted(renamed_schema(), Value::Object(record.to_db()));
    assert_eq!(restored.get("joined"), record.get("joined"));
    assert!(matches!(restored.get("joined"), Some(FieldValue::Date(_))));
}

// =============================================================================
// Nested Delegation Tests
// =============================================================================

/// Nested records and sets delegate to their own toDb()/getData().
#[test]
fn test_nested_values_delegate() {
    let line = ModelSchema::builder("line")
        .field("sku", FieldDescriptor::string().column("item_sku"))
        .build()
        .unwrap();
    let schema = ModelSchema::builder("order")
        .field("id", FieldDescriptor::string())
        .field("lines", FieldDescriptor::model(line))
        .build()
        .unwrap();

    let record = Record::new(
        schema,
        json!({ "id": "o1", "lines": [{ "sku": "a" }, { "sku": "b" }] }),
    );

    let db = record.to_db();
    assert_eq!(db["lines"], json!([{ "item_sku": "a" }, { "item_sku": "b" }]));

    let data = record.get_data();
    assert_eq!(data["lines"], json!([{ "sku": "a" }, { "sku": "b" }]));
}

/// A record set serializes every entry in storage order.
#[test]
fn test_set_serialization_order() {
    let schema = ModelSchema::builder("line")
        .field("sku", FieldDescriptor::string())
        .build()
        .unwrap();
    let set = RecordSet::with_items(
        schema,
        json!([{ "sku": "a" }, { "sku": "b" }, { "sku": "c" }]),
    );

    let skus: Vec<Value> = set.get_data().into_iter().map(|m| m["sku"].clone()).collect();
    assert_eq!(skus, vec![json!("a"), json!("b"), json!("c")]);
}
