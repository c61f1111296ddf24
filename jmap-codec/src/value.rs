//! Dynamic values stored in map entries

use crate::map::DynamicMap;
use serde_json::Number;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A value held by a [`DynamicMap`] entry.
///
/// Everything except [`Value::Opaque`] has a JSON representation. Nested maps
/// are held by handle, so a map stored here stays shared with whoever else
/// holds it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// JSON null
    #[default]
    Null,
    /// JSON boolean
    Bool(bool),
    /// JSON number
    Number(Number),
    /// JSON string
    String(String),
    /// JSON array
    Array(Vec<Value>),
    /// Nested map
    Map(DynamicMap),
    /// Arbitrary Rust value without a JSON form
    Opaque(OpaqueValue),
}

impl Value {
    /// Wrap an arbitrary Rust value
    pub fn opaque<T: Any>(value: T) -> Self {
        Value::Opaque(OpaqueValue::new(value))
    }

    /// True only for `Value::Null`
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for `Value::Null` and for an empty nested map.
    ///
    /// Template decoding treats both as "no value".
    pub fn is_nil(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Borrow as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Get as an unsigned integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Get as a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Borrow the elements of an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the nested map handle
    pub fn as_map(&self) -> Option<&DynamicMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the opaque wrapper
    pub fn as_opaque(&self) -> Option<&OpaqueValue> {
        match self {
            Value::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }

    /// Human-readable kind, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Opaque(opaque) => opaque.type_name(),
        }
    }
}

/// A Rust value stored without a JSON representation.
///
/// Clones share the same allocation. Encoding a map that contains one fails.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: &'static str,
    inner: Rc<dyn Any>,
}

impl OpaqueValue {
    /// Wrap a value, remembering its type name
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Rc::new(value),
        }
    }

    /// Rust type name of the wrapped value
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcast to the concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>", self.type_name)
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.inner), Rc::as_ptr(&other.inner))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(f: f64) -> Self {
        Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::from(f as f64)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl From<DynamicMap> for Value {
    fn from(map: DynamicMap) -> Self {
        Value::Map(map)
    }
}

impl From<&DynamicMap> for Value {
    fn from(map: &DynamicMap) -> Self {
        Value::Map(map.clone())
    }
}

impl From<OpaqueValue> for Value {
    fn from(opaque: OpaqueValue) -> Self {
        Value::Opaque(opaque)
    }
}

impl From<serde_json::Value> for Value {
    /// Objects become fresh nested maps with `Default` policies.
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => {
                let map = DynamicMap::with_capacity(object.len());
                for (key, value) in object {
                    map.set(key, Value::from(value));
                }
                Value::Map(map)
            }
        }
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42u8).as_u64(), Some(42));
        assert_eq!(Value::from(-7i32).as_i64(), Some(-7));
        assert_eq!(Value::from(1.5f64).as_f64(), Some(1.5));
        assert_eq!(Value::from("hello"), "hello");
        assert_eq!(Value::from(String::from("howdy")), "howdy");
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert!(Value::from(f64::NAN).is_null());
        assert!(Value::from(f64::INFINITY).is_null());
        assert!(Value::from(f32::NEG_INFINITY).is_null());
    }

    #[test]
    fn test_option_and_vec_conversions() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some("x")), "x");

        let arr = Value::from(vec![1, 2, 3]);
        let items = arr.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2], 3i64);
    }

    #[test]
    fn test_is_nil() {
        assert!(Value::Null.is_nil());
        assert!(Value::Map(DynamicMap::new()).is_nil());
        assert!(!Value::from("").is_nil());
        assert!(!Value::from(0).is_nil());
        assert!(!Value::Array(Vec::new()).is_nil());

        let map = DynamicMap::new();
        map.set("k", 1);
        assert!(!Value::Map(map).is_nil());
    }

    #[test]
    fn test_from_json_object_builds_maps() {
        let value = Value::from(json!({"outer": {"inner": [1, {"deep": true}]}}));
        let outer = value.as_map().unwrap().get("outer").unwrap();
        let inner = outer.as_map().unwrap().get("inner").unwrap();
        let items = inner.as_array().unwrap();
        assert_eq!(items[0], 1i64);
        let deep = items[1].as_map().unwrap();
        assert_eq!(deep.get("deep").unwrap(), true);
    }

    #[test]
    fn test_opaque_downcast_and_identity() {
        let value = Value::opaque(vec![1u8, 2, 3]);
        let opaque = value.as_opaque().unwrap();
        assert_eq!(opaque.downcast_ref::<Vec<u8>>(), Some(&vec![1u8, 2, 3]));
        assert!(opaque.downcast_ref::<String>().is_none());
        assert!(opaque.type_name().contains("Vec<u8>"));

        // Clones share identity; separately built values do not
        assert_eq!(value.clone(), value);
        assert_ne!(Value::opaque(1u8), Value::opaque(1u8));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(vec![true]).type_name(), "array");
        assert_eq!(Value::Map(DynamicMap::new()).type_name(), "map");
        assert_eq!(Value::opaque(5u32).type_name(), "u32");
    }
}
