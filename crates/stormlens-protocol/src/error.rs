//! Error types for protocol decoding

use thiserror::Error;

/// Protocol decode result type
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Error types for decoding replay sections
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input ended before the value was complete
    #[error("input truncated at bit offset {bit_offset}")]
    Truncated {
        /// Bit position of the read that failed
        bit_offset: usize,
    },

    /// Self-describing stream carried an unexpected structure tag
    #[error("corrupted tag at byte {byte_offset}: expected {expected}, found {actual}")]
    CorruptedTag {
        /// Tag demanded by the type table
        expected: u8,
        /// Tag present in the input
        actual: u8,
        /// Byte position of the tag
        byte_offset: usize,
    },

    /// Event stream carried an event identifier the schema does not know
    #[error("unknown event id {event_id} in {stream} event stream")]
    UnknownEventId {
        /// Identifier read from the stream
        event_id: i64,
        /// Which event stream was being decoded
        stream: &'static str,
    },

    /// Choice value carried a variant tag outside the schema's table
    #[error("unknown choice tag {tag}")]
    UnknownChoiceTag {
        /// Tag read from the stream
        tag: i64,
    },

    /// No protocol schema is registered for this build number
    #[error("unsupported protocol build {0}")]
    UnsupportedBuild(u32),

    /// Structurally invalid data for the expected schema
    #[error("invalid data: {0}")]
    InvalidData(String),
}
