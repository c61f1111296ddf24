//! Policy-aware JSON encoding

use crate::map::{DynamicMap, Inner};
use crate::value::Value;
use jmap_format::{child_path, JmapError, Policy, Result};
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Encoding options
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Indent the output
    pub pretty: bool,
}

impl EncodeOptions {
    /// Options producing indented output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Walks a map tree and builds its JSON form.
///
/// `stack` holds the maps currently being encoded so a map that contains one
/// of its ancestors is reported instead of recursing forever.
struct Encoder {
    stack: Vec<*const Inner>,
}

impl Encoder {
    fn new() -> Self {
        Self { stack: Vec::new() }
    }

    fn encode_map(&mut self, map: &DynamicMap, path: &str) -> Result<Map<String, JsonValue>> {
        if self.stack.contains(&map.ptr()) {
            return Err(JmapError::CycleDetected {
                path: path.to_string(),
            });
        }
        self.stack.push(map.ptr());

        let entries = map.inner.entries.borrow();
        let mut object = Map::new();
        for (key, entry) in entries.iter() {
            let rendered = match entry.policy {
                Policy::Omit => continue,
                Policy::Null => JsonValue::Null,
                // Only null is empty here; an empty map renders as `{}`.
                Policy::OmitEmpty if entry.value.is_null() => continue,
                Policy::OmitEmpty | Policy::Default => {
                    self.encode_value(&entry.value, &child_path(path, key))?
                }
            };
            object.insert(key.clone(), rendered);
        }

        self.stack.pop();
        Ok(object)
    }

    fn encode_value(&mut self, value: &Value, path: &str) -> Result<JsonValue> {
        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Bool(b) => Ok(JsonValue::Bool(*b)),
            Value::Number(n) => Ok(JsonValue::Number(n.clone())),
            Value::String(s) => Ok(JsonValue::String(s.clone())),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.iter().enumerate() {
                    out.push(self.encode_value(item, &child_path(path, &idx.to_string()))?);
                }
                Ok(JsonValue::Array(out))
            }
            Value::Map(map) => Ok(JsonValue::Object(self.encode_map(map, path)?)),
            Value::Opaque(opaque) => Err(JmapError::UnsupportedValue {
                path: path.to_string(),
                type_name: opaque.type_name(),
            }),
        }
    }

    fn flatten_map(&mut self, map: &DynamicMap, path: &str) -> Result<Map<String, JsonValue>> {
        if self.stack.contains(&map.ptr()) {
            return Err(JmapError::CycleDetected {
                path: path.to_string(),
            });
        }
        self.stack.push(map.ptr());

        let entries = map.inner.entries.borrow();
        let mut object = Map::new();
        for (key, entry) in entries.iter().filter(|(key, _)| !key.is_empty()) {
            let key_path = child_path(path, key);
            let flat = match &entry.value {
                Value::Map(nested) => JsonValue::Object(self.flatten_map(nested, &key_path)?),
                other => self.encode_value(other, &key_path)?,
            };
            object.insert(key.clone(), flat);
        }

        self.stack.pop();
        Ok(object)
    }
}

impl DynamicMap {
    /// Encode to a JSON object, applying each entry's policy.
    ///
    /// Nested maps are encoded with the same rules. Fails on opaque values
    /// and on maps that contain one of their ancestors.
    pub fn to_json_value(&self) -> Result<JsonValue> {
        Encoder::new().encode_map(self, "").map(JsonValue::Object)
    }

    /// Encode to a compact JSON string
    pub fn to_json_string(&self) -> Result<String> {
        self.encode_with(&EncodeOptions::default())
    }

    /// Encode to an indented JSON string
    pub fn to_json_string_pretty(&self) -> Result<String> {
        self.encode_with(&EncodeOptions::pretty())
    }

    /// Encode to compact JSON bytes
    pub fn to_json_vec(&self) -> Result<Vec<u8>> {
        let value = self.to_json_value()?;
        serde_json::to_vec(&value).map_err(JmapError::Serialize)
    }

    /// Encode to a JSON string using `opts`
    pub fn encode_with(&self, opts: &EncodeOptions) -> Result<String> {
        let value = self.to_json_value()?;
        let text = if opts.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map_err(JmapError::Serialize)
    }

    /// Recursive plain view of the map, ignoring policies.
    ///
    /// Unlike [`DynamicMap::flatten`], nested maps are flattened too and the
    /// result is plain JSON, so opaque values and cycles are errors.
    pub fn deep_flatten(&self) -> Result<Map<String, JsonValue>> {
        Encoder::new().flatten_map(self, "")
    }
}

impl Value {
    /// Encode to JSON. Maps inside the value apply their policies.
    pub fn to_json(&self) -> Result<JsonValue> {
        Encoder::new().encode_value(self, "")
    }
}

impl TryFrom<&Value> for JsonValue {
    type Error = JmapError;

    fn try_from(value: &Value) -> Result<Self> {
        value.to_json()
    }
}

impl TryFrom<&DynamicMap> for JsonValue {
    type Error = JmapError;

    fn try_from(map: &DynamicMap) -> Result<Self> {
        map.to_json_value()
    }
}

impl Serialize for DynamicMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().map_err(S::Error::custom)?.serialize(serializer)
    }
}
