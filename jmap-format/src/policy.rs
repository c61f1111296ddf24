//! Per-entry serialization policies

use std::fmt;

/// Serialization directive attached to every map entry.
///
/// A policy only affects encoding and template decoding. It never affects
/// whether an entry is present: `len()` counts omitted entries too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Policy {
    /// Render the stored value
    #[default]
    Default,
    /// Never render the entry
    Omit,
    /// Skip the entry when its value is null, otherwise render it.
    ///
    /// Only `null` counts as empty here, so an empty nested map still renders
    /// as `{}`. Template decoding is wider and treats an empty map as nil
    /// too, see `DynamicMap::decode_value_with`.
    OmitEmpty,
    /// Always render the entry as `null`
    Null,
}

impl Policy {
    /// All policies
    pub const ALL: [Policy; 4] = [
        Policy::Default,
        Policy::Omit,
        Policy::OmitEmpty,
        Policy::Null,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Default => "default",
            Policy::Omit => "omit",
            Policy::OmitEmpty => "omit_empty",
            Policy::Null => "null",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
