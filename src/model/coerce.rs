//! Deterministic coercion of raw JSON values into canonical field values
//!
//! Each routine returns `None` when the raw value is not coercible;
//! the caller substitutes the field default. Coercion is a fixed
//! table: the same raw value always maps to the same canonical value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::typedef::FieldType;
use super::value::FieldValue;

/// Coerces a raw JSON value by declared primitive type.
///
/// Nested-schema and custom-function types never reach this table;
/// they are resolved by `Record::set` before coercion.
pub(crate) fn coerce_json(ty: &FieldType, allowed: &[Value], raw: &Value) -> Option<FieldValue> {
    match ty {
        FieldType::String => coerce_string(raw),
        FieldType::Integer => coerce_integer(raw),
        FieldType::Float => coerce_float(raw),
        FieldType::Boolean => coerce_boolean(raw),
        FieldType::Date => coerce_date(raw),
        FieldType::Array => coerce_array(raw),
        FieldType::Object => coerce_object(raw),
        FieldType::Enum => coerce_enum(raw, allowed),
        FieldType::Mixed => Some(FieldValue::from_json(raw)),
        FieldType::Model(_) | FieldType::Custom(_) => None,
    }
}

/// Strings verbatim; numbers and booleans rendered.
pub(crate) fn coerce_string(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::String(s) => Some(FieldValue::Str(s.clone())),
        Value::Number(n) => Some(FieldValue::Str(n.to_string())),
        Value::Bool(b) => Some(FieldValue::Str(b.to_string())),
        _ => None,
    }
}

/// Integers verbatim; floats truncated; numeric strings parsed.
pub(crate) fn coerce_integer(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(FieldValue::Int(i))
            } else {
                n.as_f64().and_then(truncate_to_i64)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Some(FieldValue::Int(i))
            } else {
                trimmed.parse::<f64>().ok().and_then(truncate_to_i64)
            }
        }
        _ => None,
    }
}

fn truncate_to_i64(f: f64) -> Option<FieldValue> {
    if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(FieldValue::Int(f.trunc() as i64))
    } else {
        None
    }
}

/// Any JSON number; numeric strings parsed.
pub(crate) fn coerce_float(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Number(n) => n.as_f64().map(FieldValue::Float),
        Value::String(s) => s.trim().parse::<f64>().ok().map(FieldValue::Float),
        _ => None,
    }
}

/// Booleans verbatim; canonical truthy/falsy tokens; integers 1/0.
pub(crate) fn coerce_boolean(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(FieldValue::Bool(true)),
            "false" | "0" | "no" => Some(FieldValue::Bool(false)),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(FieldValue::Bool(true)),
            Some(0) => Some(FieldValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Recognized date/time strings, or Unix-epoch seconds.
///
/// Accepted string forms, tried in order: RFC 3339,
/// `%Y-%m-%d %H:%M:%S`, `%Y-%m-%d` (midnight). Naive forms are read
/// as UTC.
pub(crate) fn coerce_date(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::String(s) => parse_date_string(s.trim()).map(FieldValue::Date),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(FieldValue::Date),
        _ => None,
    }
}

fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// JSON arrays verbatim, elements uncoerced.
pub(crate) fn coerce_array(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Array(items) => Some(FieldValue::Array(items.clone())),
        _ => None,
    }
}

/// JSON objects verbatim.
pub(crate) fn coerce_object(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Object(map) => Some(FieldValue::Object(map.clone())),
        _ => None,
    }
}

/// Membership test against the declared allowed values.
pub(crate) fn coerce_enum(raw: &Value, allowed: &[Value]) -> Option<FieldValue> {
    if allowed.contains(raw) {
        Some(FieldValue::from_json(raw))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_coercion() {
        assert_eq!(coerce_string(&json!("abc")), Some(FieldValue::Str("abc".into())));
        assert_eq!(coerce_string(&json!(42)), Some(FieldValue::Str("42".into())));
        assert_eq!(coerce_string(&json!(true)), Some(FieldValue::Str("true".into())));
        assert_eq!(coerce_string(&json!(null)), None);
        assert_eq!(coerce_string(&json!([1])), None);
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce_integer(&json!(7)), Some(FieldValue::Int(7)));
        assert_eq!(coerce_integer(&json!(-3)), Some(FieldValue::Int(-3)));
        assert_eq!(coerce_integer(&json!(2.9)), Some(FieldValue::Int(2)));
        assert_eq!(coerce_integer(&json!("42")), Some(FieldValue::Int(42)));
        assert_eq!(coerce_integer(&json!(" 42 ")), Some(FieldValue::Int(42)));
        assert_eq!(coerce_integer(&json!("42.9")), Some(FieldValue::Int(42)));
        assert_eq!(coerce_integer(&json!("abc")), None);
        assert_eq!(coerce_integer(&json!(true)), None);
        assert_eq!(coerce_integer(&json!(null)), None);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(coerce_float(&json!(1.5)), Some(FieldValue::Float(1.5)));
        assert_eq!(coerce_float(&json!(3)), Some(FieldValue::Float(3.0)));
        assert_eq!(coerce_float(&json!("2.75")), Some(FieldValue::Float(2.75)));
        assert_eq!(coerce_float(&json!("x")), None);
    }

    #[test]
    fn test_boolean_coercion() {
        assert_eq!(coerce_boolean(&json!(true)), Some(FieldValue::Bool(true)));
        assert_eq!(coerce_boolean(&json!("true")), Some(FieldValue::Bool(true)));
        assert_eq!(coerce_boolean(&json!("FALSE")), Some(FieldValue::Bool(false)));
        assert_eq!(coerce_boolean(&json!("yes")), Some(FieldValue::Bool(true)));
        assert_eq!(coerce_boolean(&json!("0")), Some(FieldValue::Bool(false)));
        assert_eq!(coerce_boolean(&json!(1)), Some(FieldValue::Bool(true)));
        assert_eq!(coerce_boolean(&json!(2)), None);
        assert_eq!(coerce_boolean(&json!("maybe")), None);
    }

    #[test]
    fn test_date_coercion_forms() {
        let rfc = coerce_date(&json!("2024-05-01T10:30:00Z")).unwrap();
        let spaced = coerce_date(&json!("2024-05-01 10:30:00")).unwrap();
        assert_eq!(rfc, spaced);

        let midnight = coerce_date(&json!("2024-05-01")).unwrap();
        let explicit = coerce_date(&json!("2024-05-01T00:00:00Z")).unwrap();
        assert_eq!(midnight, explicit);

        let epoch = coerce_date(&json!(0)).unwrap();
        assert_eq!(epoch, coerce_date(&json!("1970-01-01T00:00:00Z")).unwrap());

        assert_eq!(coerce_date(&json!("not a date")), None);
        assert_eq!(coerce_date(&json!(true)), None);
    }

    #[test]
    fn test_date_coercion_is_idempotent() {
        let first = coerce_date(&json!("2024-05-01 10:30:00")).unwrap();
        let again = coerce_date(&first.data_value()).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_array_and_object_coercion() {
        assert_eq!(
            coerce_array(&json!([1, "a"])),
            Some(FieldValue::Array(vec![json!(1), json!("a")]))
        );
        assert_eq!(coerce_array(&json!("a")), None);

        let map = json!({"k": 1});
        assert_eq!(
            coerce_object(&map),
            Some(FieldValue::Object(map.as_object().unwrap().clone()))
        );
        assert_eq!(coerce_object(&json!([1])), None);
    }

    #[test]
    fn test_enum_membership() {
        let allowed = [json!("draft"), json!("published"), json!(3)];
        assert_eq!(
            coerce_enum(&json!("draft"), &allowed),
            Some(FieldValue::Str("draft".into()))
        );
        assert_eq!(coerce_enum(&json!(3), &allowed), Some(FieldValue::Int(3)));
        assert_eq!(coerce_enum(&json!("deleted"), &allowed), None);
    }

    #[test]
    fn test_mixed_accepts_null_verbatim() {
        assert_eq!(
            coerce_json(&FieldType::Mixed, &[], &json!(null)),
            Some(FieldValue::Null)
        );
        assert_eq!(
            coerce_json(&FieldType::Mixed, &[], &json!({"a": 1})),
            Some(FieldValue::Object(json!({"a": 1}).as_object().unwrap().clone()))
        );
    }
}
