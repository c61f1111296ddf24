//! JMAP Format - Core primitives for policy-aware dynamic JSON maps
//!
//! This crate provides the building blocks shared by the codec and I/O layers
//! with no I/O dependencies. It includes:
//!
//! - Per-entry serialization policies
//! - Error types and error kinds
//! - Decode limits
//! - JSON type names for diagnostics

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod limits;
pub mod policy;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, JmapError, Result};
pub use limits::Limits;
pub use policy::Policy;
pub use types::json_type_name;

/// Build a JSON-pointer-style path by appending one key to a parent path.
///
/// Keys are escaped according to RFC 6901 (`~` → `~0`, `/` → `~1`).
pub fn child_path(parent: &str, key: &str) -> String {
    let mut path = String::with_capacity(parent.len() + key.len() + 1);
    path.push_str(parent);
    path.push('/');
    for ch in key.chars() {
        match ch {
            '~' => path.push_str("~0"),
            '/' => path.push_str("~1"),
            other => path.push(other),
        }
    }
    path
}
