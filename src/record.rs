//! JSON-backed records with named accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object returned by the API.
///
/// Typed wrappers such as [`Collection`](crate::Collection) and
/// [`Entry`](crate::Entry) expose named accessors on top of it; anything
/// they do not cover stays reachable through [`get`](Record::get).
///
/// # Examples
///
/// ```
/// use feedly_client::Record;
/// use serde_json::json;
///
/// let record = Record::from_value(json!({"label": "Tech", "created": 1500000000000_i64}));
/// assert_eq!(record.str_field("label"), Some("Tech"));
/// assert_eq!(record.i64_field("created"), Some(1_500_000_000_000));
/// assert!(record.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value; non-objects become an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// A raw field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A string field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// An integer field.
    pub fn i64_field(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_i64()
    }

    /// A boolean field.
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    /// An array field; missing or non-array fields read as empty.
    pub fn array_field(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A millisecond Unix timestamp field.
    pub fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.i64_field(key)?)
    }

    /// Sets a field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// The underlying JSON object.
    pub fn json(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwraps into the underlying JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}
