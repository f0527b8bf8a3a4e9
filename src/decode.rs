//! Response-shape normalization shared by the backend adapters.
//!
//! Both backends answer list endpoints either with a bare JSON array or with
//! an object wrapping the array under some field (`Items`, `content`,
//! `books`, ...). [`ListResponse`] decodes either shape and
//! [`ListResponse::into_items`] yields the same element sequence for both.
//!
//! Booklore additionally moves many book fields into a nested `metadata`
//! object. [`FieldSpec`] and [`resolve`] implement the two-stage lookup:
//! top-level names first, then the metadata names, skipping `null`s.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// A list endpoint's body: flat array or enveloped object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse {
    Enveloped(Map<String, Value>),
    Flat(Vec<Value>),
}

impl ListResponse {
    /// Decode a response body. Anything that is neither an array nor an
    /// object (a bare string, `null`, ...) yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// Extract the element list.
    ///
    /// For an envelope, the first of `fields` holding an array wins. A field
    /// holding an object is searched one level deeper with the same names,
    /// which covers `{"books": {"items": [...]}}`. No matching field gives an
    /// empty list.
    pub fn into_items(self, fields: &[&str]) -> Vec<Value> {
        match self {
            ListResponse::Flat(items) => items,
            ListResponse::Enveloped(mut map) => {
                for field in fields {
                    match map.remove(*field) {
                        Some(Value::Array(items)) => return items,
                        Some(Value::Object(inner)) => {
                            let nested = ListResponse::Enveloped(inner).into_items(fields);
                            if !nested.is_empty() {
                                return nested;
                            }
                        }
                        _ => {}
                    }
                }
                Vec::new()
            }
        }
    }
}

/// Decode `value` as a list and pull out its elements in one step.
pub fn list_items(value: Value, fields: &[&str]) -> Vec<Value> {
    ListResponse::from_value(value)
        .map(|r| r.into_items(fields))
        .unwrap_or_default()
}

/// Where to look for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Names probed on the record itself.
    pub top: &'static [&'static str],
    /// Names probed on the record's metadata sub-object.
    pub metadata: &'static [&'static str],
}

/// Two-stage lookup: top-level names, then `metadata_key` object names.
/// `null` counts as absent at both stages.
pub fn resolve<'a>(
    record: &'a Map<String, Value>,
    metadata_key: &str,
    spec: &FieldSpec,
) -> Option<&'a Value> {
    let present = |obj: &'a Map<String, Value>, names: &[&str]| {
        names
            .iter()
            .filter_map(|n| obj.get(*n))
            .find(|v| !v.is_null())
    };

    present(record, spec.top).or_else(|| {
        record
            .get(metadata_key)
            .and_then(Value::as_object)
            .and_then(|meta| present(meta, spec.metadata))
    })
}

/// Scalar as a trimmed, non-empty string. Numbers are rendered.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A list of names. Accepts an array of strings, an array of objects
/// carrying `name`/`Name`, or a single comma-separated string.
pub fn as_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => obj
                    .get("name")
                    .or_else(|| obj.get("Name"))
                    .and_then(as_string),
                other => as_string(other),
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Identifier that may arrive as a string or a number. Empty strings are
/// rejected so every record carries a usable id.
pub fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match as_string(&value) {
        Some(id) => Ok(id),
        None => Err(de::Error::custom(format!("invalid identifier: {}", value))),
    }
}

/// Name list in any of the shapes [`as_string_list`] accepts; `null` is empty.
pub fn de_names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_string_list(&value))
}

/// Optional text: scalars via [`as_string`], anything else is `None`.
pub fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_string(&value))
}

/// Text that falls back to the empty string instead of failing.
pub fn de_string_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_string(deserializer)?.unwrap_or_default())
}

/// Integer given as a number or a numeric string; out-of-range is `None`.
pub fn de_opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_i64(&value).and_then(|n| i32::try_from(n).ok()))
}

pub fn de_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_i64(&value))
}

pub fn de_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_f64(&value))
}
