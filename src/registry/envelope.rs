//! List envelope decoding.
//!
//! The authority answers list calls either with a bare array or with an object that holds the
//! array under one of a few well-known keys. The accepted envelopes are tried in a fixed order:
//! the payload itself when it is an array, then each key of `keys` in turn. The first match
//! wins; nothing else is guessed.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const UNEXPECTED_STRUCTURE: &str = "Unexpected data structure from API";
pub const INVALID_FORMAT: &str = "Invalid data format received from API";

/// Locate the list inside `payload`.
pub fn extract_list<'a>(payload: &'a Value, keys: &[&str]) -> AppResult<&'a Vec<Value>> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(map) => keys
            .iter()
            .find_map(|k| map.get(*k).and_then(|v| v.as_array()))
            .ok_or_else(|| AppError::shape("unexpected_shape", UNEXPECTED_STRUCTURE)),
        _ => Err(AppError::shape("invalid_format", INVALID_FORMAT)),
    }
}

/// Locate the list and decode every element as `T`. One bad element rejects the whole list.
pub fn decode_list<T: DeserializeOwned>(payload: &Value, keys: &[&str]) -> AppResult<Vec<T>> {
    let items = extract_list(payload, keys)?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            T::deserialize(v).map_err(|e| AppError::shape("invalid_item", format!("{} (item {}: {})", UNEXPECTED_STRUCTURE, i, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    const KEYS: &[&str] = &["users", "data", "result", "userList"];

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: u32,
    }

    #[test]
    fn bare_array_and_wrapped_array_decode_the_same() {
        let bare = json!([{"id": 1}, {"id": 2}]);
        let wrapped = json!({"success": true, "data": [{"id": 1}, {"id": 2}]});
        let a: Vec<Row> = decode_list(&bare, KEYS).unwrap();
        let b: Vec<Row> = decode_list(&wrapped, KEYS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn keys_are_probed_in_priority_order() {
        let payload = json!({"userList": [{"id": 9}], "data": [{"id": 2}], "users": "not a list"});
        let rows: Vec<Row> = decode_list(&payload, KEYS).unwrap();
        assert_eq!(rows, vec![Row { id: 2 }]);
    }

    #[test]
    fn unknown_object_is_a_shape_error() {
        let err = extract_list(&json!({"items": []}), KEYS).unwrap_err();
        assert_eq!(err, AppError::shape("unexpected_shape", UNEXPECTED_STRUCTURE));
    }

    #[test]
    fn scalars_are_invalid_format() {
        for payload in [json!("hello"), json!(3), json!(null)] {
            assert_eq!(extract_list(&payload, KEYS).unwrap_err().code_str(), "invalid_format");
        }
    }

    #[test]
    fn bad_element_rejects_whole_list() {
        let err = decode_list::<Row>(&json!([{"id": 1}, {"id": "x"}]), KEYS).unwrap_err();
        assert_eq!(err.code_str(), "invalid_item");
    }
}
