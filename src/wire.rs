//! Lenient field decoders for authority payloads.
//! The backend is not consistent about JSON types: ids arrive as numbers or strings and
//! aggregate counts come back from SQL as numeric strings.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Accept a string or a number and keep it as a string.
pub fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number id, got {}", other))),
    }
}

/// Accept an integer or an integer-valued string.
pub fn int_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = Value::deserialize(d)?;
    to_i64(&v).ok_or_else(|| de::Error::custom(format!("expected integer, got {}", v)))
}

/// Like [`int_or_string`] but `null` (or a missing field with `#[serde(default)]`) is `None`.
pub fn opt_int_or_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v = Value::deserialize(d)?;
    if v.is_null() {
        return Ok(None);
    }
    to_i64(&v).map(Some).ok_or_else(|| de::Error::custom(format!("expected integer, got {}", v)))
}

/// `null` reads as the type's default. Outer-joined columns come back null for unmatched rows.
pub fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

fn to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
