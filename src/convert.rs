//! Conversion between wire datums and user-facing values.
//!
//! Documents cross the API boundary as [`serde_json::Value`] (or any serde
//! type via [`from_datum`]/[`to_datum`]); on the wire they travel as
//! [`Datum`] trees.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{DriverError, DriverResult};
use crate::proto::{Datum, DatumPair, DatumType};

/// Build a wire datum from a JSON value. Total: every JSON value has a
/// datum representation. Numbers outside the f64 range lose their payload
/// and surface as a protocol violation on the way back.
pub fn value_to_datum(value: &Value) -> Datum {
    match value {
        Value::Null => typed(DatumType::RNull),
        Value::Bool(b) => Datum {
            r_bool: Some(*b),
            ..typed(DatumType::RBool)
        },
        Value::Number(n) => Datum {
            r_num: n.as_f64(),
            ..typed(DatumType::RNum)
        },
        Value::String(s) => Datum {
            r_str: Some(s.clone()),
            ..typed(DatumType::RStr)
        },
        Value::Array(items) => Datum {
            r_array: items.iter().map(value_to_datum).collect(),
            ..typed(DatumType::RArray)
        },
        Value::Object(map) => Datum {
            r_object: map
                .iter()
                .map(|(key, val)| DatumPair {
                    key: Some(key.clone()),
                    val: Some(value_to_datum(val)),
                })
                .collect(),
            ..typed(DatumType::RObject)
        },
    }
}

/// Rebuild a JSON value from a wire datum.
pub fn datum_to_value(datum: &Datum) -> DriverResult<Value> {
    let kind = datum
        .r#type
        .and_then(|t| DatumType::try_from(t).ok())
        .ok_or_else(|| DriverError::ProtocolViolation("datum without a type".to_string()))?;

    match kind {
        DatumType::RNull => Ok(Value::Null),
        DatumType::RBool => Ok(Value::Bool(datum.r_bool.unwrap_or(false))),
        DatumType::RNum => {
            let n = datum.r_num.ok_or_else(|| {
                DriverError::ProtocolViolation("numeric datum without a value".to_string())
            })?;
            number_from_f64(n).map(Value::Number)
        }
        DatumType::RStr => Ok(Value::String(datum.r_str.clone().unwrap_or_default())),
        DatumType::RArray => datum
            .r_array
            .iter()
            .map(datum_to_value)
            .collect::<DriverResult<Vec<_>>>()
            .map(Value::Array),
        DatumType::RObject => {
            let mut map = serde_json::Map::with_capacity(datum.r_object.len());
            for pair in &datum.r_object {
                let key = pair.key.clone().ok_or_else(|| {
                    DriverError::ProtocolViolation("object entry without a key".to_string())
                })?;
                let val = match &pair.val {
                    Some(datum) => datum_to_value(datum)?,
                    None => Value::Null,
                };
                map.insert(key, val);
            }
            Ok(Value::Object(map))
        }
    }
}

/// Serialize any serde value into a wire datum.
pub fn to_datum<T: Serialize>(value: &T) -> DriverResult<Datum> {
    let json = serde_json::to_value(value).map_err(|e| DriverError::Conversion(e.to_string()))?;
    Ok(value_to_datum(&json))
}

/// Deserialize a wire datum into any serde type.
pub fn from_datum<T: DeserializeOwned>(datum: &Datum) -> DriverResult<T> {
    let json = datum_to_value(datum)?;
    serde_json::from_value(json).map_err(|e| DriverError::Conversion(e.to_string()))
}

/// The wire carries every number as a double; integral values come back
/// as JSON integers so typed fields like counts deserialize cleanly.
fn number_from_f64(n: f64) -> DriverResult<serde_json::Number> {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Ok(serde_json::Number::from(n as i64))
    } else {
        serde_json::Number::from_f64(n)
            .ok_or_else(|| DriverError::Conversion(format!("non-finite number {}", n)))
    }
}

fn typed(kind: DatumType) -> Datum {
    Datum {
        r#type: Some(kind as i32),
        ..Datum::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_nested_document_roundtrip() {
        let doc = json!({
            "title": "Hello",
            "views": 42,
            "published": true,
            "tags": ["intro", "news"],
            "author": { "name": "Alice", "email": null },
        });

        let datum = value_to_datum(&doc);
        assert_eq!(datum.r#type(), DatumType::RObject);
        assert_eq!(datum_to_value(&datum).unwrap(), doc);
    }

    #[test]
    fn test_typed_deserialization() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Post {
            title: String,
            views: u64,
        }

        let datum = value_to_datum(&json!({ "title": "Hello", "views": 42 }));
        let post: Post = from_datum(&datum).unwrap();
        assert_eq!(
            post,
            Post {
                title: "Hello".to_string(),
                views: 42,
            }
        );
    }

    #[test]
    fn test_fractional_numbers_stay_floats() {
        let datum = value_to_datum(&json!(1.5));
        assert_eq!(datum.r_num, Some(1.5));
        assert_eq!(datum_to_value(&datum).unwrap(), json!(1.5));
    }

    #[test]
    fn test_type_mismatch_is_a_conversion_error() {
        let datum = value_to_datum(&json!("not a number"));
        let err = from_datum::<u64>(&datum).unwrap_err();
        assert!(matches!(err, DriverError::Conversion(_)));
    }

    #[test]
    fn test_untyped_datum_is_rejected() {
        let err = datum_to_value(&Datum::default()).unwrap_err();
        assert!(matches!(err, DriverError::ProtocolViolation(_)));
    }
}
