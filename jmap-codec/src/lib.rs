//! JMAP Codec - Policy-aware dynamic JSON maps
//!
//! This crate provides the `DynamicMap` container and its JSON codec:
//!
//! - `DynamicMap`: string keys mapped to values, each with a serialization policy
//! - `Value`: the tagged sum stored in entries, including nested maps
//! - Encoding that applies `Omit`, `OmitEmpty` and `Null` per entry
//! - Decoding into fresh maps or into preset templates, re-wrapping nested
//!   objects as maps
//!
//! ```
//! use jmap_codec::{DynamicMap, Policy};
//!
//! let map = DynamicMap::new();
//! map.set("greeting", "hello");
//! map.set_with("secret", "s3cr3t", Policy::Omit);
//! assert_eq!(map.to_json_string().unwrap(), r#"{"greeting":"hello"}"#);
//!
//! let decoded = DynamicMap::from_json_str(r#"{"nested":{"season":"fall"}}"#).unwrap();
//! let nested = decoded.get("nested").unwrap();
//! assert_eq!(nested.as_map().unwrap().get("season").unwrap(), "fall");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod decode;
pub mod encode;
pub mod map;
pub mod value;

// Re-export commonly used types
pub use jmap_format::{ErrorKind, JmapError, Limits, Policy, Result};

// Re-export our own types
pub use decode::{DecodeOptions, NestedMode};
pub use encode::EncodeOptions;
pub use map::{DynamicMap, Entry};
pub use value::{OpaqueValue, Value};
