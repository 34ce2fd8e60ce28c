//! Blob location value object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a version's bytes physically live, as reported by the transfer
/// proxy: `{service, bucket, object, ...}`. The engine never interprets
/// these values beyond equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionLocation(pub Map<String, Value>);

impl VersionLocation {
    /// Build a location from a JSON object. Non-object values yield an
    /// empty location.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// The storage service name, if present.
    pub fn service(&self) -> Option<&str> {
        self.0.get("service").and_then(Value::as_str)
    }

    /// The external object key, if present.
    pub fn object(&self) -> Option<&str> {
        self.0.get("object").and_then(Value::as_str)
    }

    /// Whether the location carries no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of the location without the given keys.
    pub fn without(&self, ignored: &[String]) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(k, _)| !ignored.iter().any(|i| i == *k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Whether two locations describe the same logical resource once the
    /// per-upload `ignored` keys are dropped.
    pub fn same_resource(&self, other: &Self, ignored: &[String]) -> bool {
        self.without(ignored) == other.without(ignored)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}
