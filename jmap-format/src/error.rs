//! Error types for JMAP

use thiserror::Error;

/// Broad classification of a [`JmapError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input was not a valid JSON object or violated decode limits
    Decode,
    /// A stored value could not be represented as JSON
    Encode,
    /// Options were outside their hard limits
    Config,
    /// Reading or writing the underlying stream failed
    Io,
}

/// JMAP error types
#[derive(Debug, Error)]
pub enum JmapError {
    /// Input is not syntactically valid JSON.
    #[error("Malformed input: {0}")]
    MalformedInput(#[source] serde_json::Error),
    /// Top-level input is valid JSON but not an object.
    #[error("Malformed input: expected a JSON object, found {found_type}")]
    NotAnObject {
        /// JSON type found instead of an object
        found_type: &'static str,
    },
    /// Nested objects exceed the configured depth.
    #[error("Depth limit exceeded at '{path}': depth {depth} (max: {max_depth})")]
    DepthLimitExceeded {
        /// Path of the object that crossed the limit
        path: String,
        /// Depth reached
        depth: usize,
        /// Maximum depth allowed
        max_depth: usize,
    },
    /// A key exceeds the configured length.
    #[error("Key too long at '{path}': {length} bytes (max: {max_length} bytes)")]
    KeyTooLong {
        /// Path of the offending key
        path: String,
        /// Key length in bytes
        length: usize,
        /// Maximum key length allowed
        max_length: usize,
    },
    /// An array exceeds the configured length.
    #[error("Array too long at '{path}': {length} elements (max: {max_length})")]
    ArrayTooLong {
        /// Path of the offending array
        path: String,
        /// Number of elements
        length: usize,
        /// Maximum number of elements allowed
        max_length: usize,
    },
    /// Input stream exceeds the configured size.
    #[error("Input too large: more than {limit_bytes} bytes")]
    InputTooLarge {
        /// Maximum input size allowed (bytes)
        limit_bytes: usize,
    },
    /// A stored value has no JSON representation.
    #[error("Unsupported value at '{path}': {type_name} is not representable as JSON")]
    UnsupportedValue {
        /// Path of the offending entry
        path: String,
        /// Rust type name of the stored value
        type_name: &'static str,
    },
    /// A nested map contains itself.
    #[error("Cycle detected at '{path}': a nested map refers back to one of its parents")]
    CycleDetected {
        /// Path where the cycle closes
        path: String,
    },
    /// Rendering the JSON text failed.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Options exceed hard limits.
    #[error("Configuration exceeds hard limits: {reason}")]
    LimitsExceedHardMax {
        /// Which limit was exceeded
        reason: String,
    },
    /// A record in a line-delimited stream failed.
    #[error("Line {line}: {source}")]
    Line {
        /// 1-based line number
        line: usize,
        /// Error for that record
        #[source]
        source: Box<JmapError>,
    },
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JmapError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            JmapError::MalformedInput(_)
            | JmapError::NotAnObject { .. }
            | JmapError::DepthLimitExceeded { .. }
            | JmapError::KeyTooLong { .. }
            | JmapError::ArrayTooLong { .. }
            | JmapError::InputTooLarge { .. } => ErrorKind::Decode,
            JmapError::UnsupportedValue { .. }
            | JmapError::CycleDetected { .. }
            | JmapError::Serialize(_) => ErrorKind::Encode,
            JmapError::LimitsExceedHardMax { .. } => ErrorKind::Config,
            JmapError::Line { source, .. } => source.kind(),
            JmapError::Io(_) => ErrorKind::Io,
        }
    }

    /// True for errors raised while decoding input
    pub fn is_decode(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }

    /// True for errors raised while encoding a map
    pub fn is_encode(&self) -> bool {
        self.kind() == ErrorKind::Encode
    }

    /// Map a serde_json parse error, separating I/O failures from bad input.
    pub fn from_parse(err: serde_json::Error) -> Self {
        if err.is_io() {
            JmapError::Io(err.into())
        } else {
            JmapError::MalformedInput(err)
        }
    }

    /// Attach a 1-based line number
    pub fn at_line(self, line: usize) -> Self {
        JmapError::Line {
            line,
            source: Box::new(self),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, JmapError>;
