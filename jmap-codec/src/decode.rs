//! JSON decoding into maps, including decoding into preset templates

use crate::map::{DynamicMap, Entry};
use crate::value::Value;
use jmap_format::{child_path, json_type_name, JmapError, Limits, Policy, Result};
use serde::de::{Deserialize, Deserializer, Error as _};
use serde_json::{Map, Value as JsonValue};

/// How incoming nested objects are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedMode {
    /// Decode each nested object into a fresh `DynamicMap`
    #[default]
    Recurse,
    /// Leave keys whose incoming value is an object untouched
    Skip,
}

/// Decoding options
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Input limits. `None` accepts anything serde_json can parse.
    pub limits: Option<Limits>,
    /// Nested object handling
    pub nested: NestedMode,
}

impl DecodeOptions {
    /// Options that enforce `limits`
    pub fn limited(limits: Limits) -> Self {
        Self {
            limits: Some(limits),
            ..Self::default()
        }
    }

    /// Check the configured limits against their hard maxima
    pub fn validate(&self) -> Result<()> {
        match &self.limits {
            Some(limits) => limits.validate(),
            None => Ok(()),
        }
    }
}

struct Decoder<'a> {
    limits: Option<&'a Limits>,
    nested: NestedMode,
}

impl Decoder<'_> {
    /// Merge `object` into `target`, letting template entries steer each key.
    fn merge_object(
        &self,
        target: &DynamicMap,
        object: Map<String, JsonValue>,
        path: &str,
        depth: usize,
    ) -> Result<()> {
        for (key, incoming) in object {
            let key_path = child_path(path, &key);
            self.check_key(&key, &key_path)?;

            // Omit and Null entries holding a value win over the input. Every
            // entry written here is reset to Default.
            match target.entry(&key) {
                Some(Entry {
                    value,
                    policy: Policy::Omit,
                }) => {
                    if !value.is_nil() {
                        target.insert_entry(key, Entry::new(value, Policy::Default));
                    }
                    continue;
                }
                Some(Entry {
                    value,
                    policy: Policy::Null,
                }) => {
                    let kept = if value.is_nil() { Value::Null } else { value };
                    target.insert_entry(key, Entry::new(kept, Policy::Default));
                    continue;
                }
                _ => {}
            }

            let value = match incoming {
                JsonValue::Object(nested) => match self.nested {
                    NestedMode::Recurse => self.nested_map(nested, &key_path, depth + 1)?,
                    NestedMode::Skip => continue,
                },
                other => self.convert(other, &key_path, depth)?,
            };
            target.insert_entry(key, Entry::new(value, Policy::Default));
        }
        Ok(())
    }

    fn nested_map(
        &self,
        object: Map<String, JsonValue>,
        path: &str,
        depth: usize,
    ) -> Result<Value> {
        self.check_depth(path, depth)?;
        let map = DynamicMap::with_capacity(object.len());
        self.merge_object(&map, object, path, depth)?;
        Ok(Value::Map(map))
    }

    fn convert(&self, json: JsonValue, path: &str, depth: usize) -> Result<Value> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Bool(b)),
            JsonValue::Number(n) => Ok(Value::Number(n)),
            JsonValue::String(s) => Ok(Value::String(s)),
            JsonValue::Array(items) => {
                self.check_array(&items, path)?;
                self.check_depth(path, depth + 1)?;
                let mut out = Vec::with_capacity(items.len());
                for (idx, item) in items.into_iter().enumerate() {
                    let item_path = child_path(path, &idx.to_string());
                    out.push(self.convert(item, &item_path, depth + 1)?);
                }
                Ok(Value::Array(out))
            }
            // Objects inside arrays always become maps, whatever the nested mode.
            JsonValue::Object(object) => self.nested_map(object, path, depth + 1),
        }
    }

    fn check_key(&self, key: &str, path: &str) -> Result<()> {
        match self.limits {
            Some(limits) if key.len() > limits.max_key_len => Err(JmapError::KeyTooLong {
                path: path.to_string(),
                length: key.len(),
                max_length: limits.max_key_len,
            }),
            _ => Ok(()),
        }
    }

    fn check_array(&self, items: &[JsonValue], path: &str) -> Result<()> {
        match self.limits {
            Some(limits) if items.len() > limits.max_array_len => Err(JmapError::ArrayTooLong {
                path: path.to_string(),
                length: items.len(),
                max_length: limits.max_array_len,
            }),
            _ => Ok(()),
        }
    }

    fn check_depth(&self, path: &str, depth: usize) -> Result<()> {
        match self.limits {
            Some(limits) if depth > limits.max_depth => Err(JmapError::DepthLimitExceeded {
                path: path.to_string(),
                depth,
                max_depth: limits.max_depth,
            }),
            _ => Ok(()),
        }
    }
}

impl DynamicMap {
    /// Decode a JSON object from text into this map.
    ///
    /// Existing entries act as a template, see [`DynamicMap::decode_value_with`].
    pub fn decode_str(&self, input: &str) -> Result<()> {
        self.decode_str_with(input, &DecodeOptions::default())
    }

    /// Decode a JSON object from text into this map using `opts`
    pub fn decode_str_with(&self, input: &str, opts: &DecodeOptions) -> Result<()> {
        let json: JsonValue = serde_json::from_str(input).map_err(JmapError::from_parse)?;
        self.decode_value_with(json, opts)
    }

    /// Decode a JSON object from bytes into this map
    pub fn decode_slice(&self, input: &[u8]) -> Result<()> {
        self.decode_slice_with(input, &DecodeOptions::default())
    }

    /// Decode a JSON object from bytes into this map using `opts`
    pub fn decode_slice_with(&self, input: &[u8], opts: &DecodeOptions) -> Result<()> {
        let json: JsonValue = serde_json::from_slice(input).map_err(JmapError::from_parse)?;
        self.decode_value_with(json, opts)
    }

    /// Decode an already parsed JSON object into this map
    pub fn decode_value(&self, json: JsonValue) -> Result<()> {
        self.decode_value_with(json, &DecodeOptions::default())
    }

    /// Decode an already parsed JSON object into this map using `opts`.
    ///
    /// For every incoming key the policy of the entry already stored under
    /// that key decides the outcome:
    ///
    /// - `Omit`: a stored value is kept; a nil one (null or an empty map)
    ///   leaves the entry untouched.
    /// - `Null`: a stored value is kept; a nil one becomes `Null`.
    /// - `OmitEmpty`, `Default`, or no entry: the incoming value is stored.
    ///
    /// Every entry written by the decode gets `Policy::Default`, so only an
    /// untouched `Omit` entry keeps its policy. Incoming objects are decoded
    /// into fresh nested maps. No limits apply unless `opts` sets them. On
    /// error the map keeps whatever was merged before the failure.
    pub fn decode_value_with(&self, json: JsonValue, opts: &DecodeOptions) -> Result<()> {
        opts.validate()?;
        let object = match json {
            JsonValue::Object(object) => object,
            other => {
                return Err(JmapError::NotAnObject {
                    found_type: json_type_name(&other),
                })
            }
        };
        Decoder {
            limits: opts.limits.as_ref(),
            nested: opts.nested,
        }
        .merge_object(self, object, "", 0)
    }

    /// Build a new map from JSON text
    pub fn from_json_str(input: &str) -> Result<Self> {
        let map = Self::new();
        map.decode_str(input)?;
        Ok(map)
    }

    /// Build a new map from JSON bytes
    pub fn from_json_slice(input: &[u8]) -> Result<Self> {
        let map = Self::new();
        map.decode_slice(input)?;
        Ok(map)
    }

    /// Build a new map from a parsed JSON object
    pub fn from_json_value(json: JsonValue) -> Result<Self> {
        let map = Self::new();
        map.decode_value(json)?;
        Ok(map)
    }
}

impl TryFrom<JsonValue> for DynamicMap {
    type Error = JmapError;

    fn try_from(json: JsonValue) -> Result<Self> {
        DynamicMap::from_json_value(json)
    }
}

impl<'de> Deserialize<'de> for DynamicMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let object = Map::<String, JsonValue>::deserialize(deserializer)?;
        DynamicMap::from_json_value(JsonValue::Object(object)).map_err(D::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}
