//! Decode limits and configuration

use crate::error::{JmapError, Result};

/// Limits applied while decoding untrusted JSON into maps.
///
/// The codec only enforces these when asked to. The stream readers in
/// `jmap-io` enable the defaults below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of maps below the root (default: 64, hard: 127)
    pub max_depth: usize,
    /// Maximum key length in bytes (default: 64 KiB, hard: 16 MiB)
    pub max_key_len: usize,
    /// Maximum elements per array (default: 1,000,000, hard: 16,777,216)
    pub max_array_len: usize,
}

impl Limits {
    /// Hard ceiling for `max_depth`. serde_json refuses to parse deeper input.
    pub const HARD_MAX_DEPTH: usize = 127;
    /// Hard ceiling for `max_key_len`
    pub const HARD_MAX_KEY_LEN: usize = 16 * 1024 * 1024;
    /// Hard ceiling for `max_array_len`
    pub const HARD_MAX_ARRAY_LEN: usize = 16 * 1024 * 1024;

    /// Limits set to their hard ceilings
    pub fn hard() -> Self {
        Self {
            max_depth: Self::HARD_MAX_DEPTH,
            max_key_len: Self::HARD_MAX_KEY_LEN,
            max_array_len: Self::HARD_MAX_ARRAY_LEN,
        }
    }

    /// Check these limits against the hard ceilings
    pub fn validate(&self) -> Result<()> {
        if self.max_depth > Self::HARD_MAX_DEPTH {
            return Err(JmapError::LimitsExceedHardMax {
                reason: format!(
                    "max_depth {} exceeds hard limit {}",
                    self.max_depth,
                    Self::HARD_MAX_DEPTH
                ),
            });
        }
        if self.max_key_len > Self::HARD_MAX_KEY_LEN {
            return Err(JmapError::LimitsExceedHardMax {
                reason: format!(
                    "max_key_len {} exceeds hard limit {}",
                    self.max_key_len,
                    Self::HARD_MAX_KEY_LEN
                ),
            });
        }
        if self.max_array_len > Self::HARD_MAX_ARRAY_LEN {
            return Err(JmapError::LimitsExceedHardMax {
                reason: format!(
                    "max_array_len {} exceeds hard limit {}",
                    self.max_array_len,
                    Self::HARD_MAX_ARRAY_LEN
                ),
            });
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_key_len: 64 * 1024,
            max_array_len: 1_000_000,
        }
    }
}
