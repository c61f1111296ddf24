//! JMAP I/O - Readers, writers and streams for `DynamicMap`
//!
//! This crate provides the stream layer on top of `jmap-codec`:
//!
//! - Bounded reading of one JSON object into a new map or a preset template
//! - Writing encoded maps to any `io::Write`
//! - NDJSON streams of maps, one object per line

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use jmap_codec::{
    DecodeOptions, DynamicMap, EncodeOptions, ErrorKind, JmapError, Limits, NestedMode, Policy,
    Result, Value,
};
pub use reader::{read_into, read_map, MapStream, ReadSummary};
pub use writer::{write_map, write_ndjson, WriteSummary};

/// Options for reading maps from a stream
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Maximum bytes accepted for one document (default: 16 MiB, hard: 1 GiB)
    pub max_input_bytes: usize,
    /// Decode options applied to each document (default: `Limits::default()`)
    pub decode: DecodeOptions,
}

impl ReadOptions {
    /// Hard ceiling for `max_input_bytes`
    pub const HARD_MAX_INPUT_BYTES: usize = 1024 * 1024 * 1024;

    /// Check these options against their hard limits
    pub fn validate(&self) -> Result<()> {
        if self.max_input_bytes > Self::HARD_MAX_INPUT_BYTES {
            return Err(JmapError::LimitsExceedHardMax {
                reason: format!(
                    "max_input_bytes {} exceeds hard limit {}",
                    self.max_input_bytes,
                    Self::HARD_MAX_INPUT_BYTES
                ),
            });
        }
        self.decode.validate()
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_input_bytes: 16 * 1024 * 1024,
            decode: DecodeOptions::limited(Limits::default()),
        }
    }
}
