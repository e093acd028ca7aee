//! # Codec Error Types
//!
//! All errors that can occur while encoding or decoding wire data.

use thiserror::Error;

/// Errors that can occur in the codec layer.
///
/// Every variant is detected *before* any byte is written or consumed, so a
/// failed call never leaves a writer or reader half-advanced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A write would exceed the writer's capacity.
    #[error("overflow: tried to write {requested} bytes, only {available} bytes of capacity left")]
    Overflow {
        /// Number of bytes the write needed.
        requested: usize,
        /// Number of bytes still available.
        available: usize,
    },

    /// A read requested more bytes than remain in the source.
    #[error("underrun: tried to read {requested} bytes, only {available} bytes remain")]
    Underrun {
        /// Number of bytes the read needed.
        requested: usize,
        /// Number of bytes still available.
        available: usize,
    },

    /// A length-prefixed string did not contain valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A discriminant byte did not match any known variant.
    #[error("invalid tag: {tag:#04x}")]
    InvalidTag {
        /// The offending tag value.
        tag: u8,
    },

    /// A value cannot be represented by the requested encoding.
    #[error("value {value} out of range, maximum is {max}")]
    OutOfRange {
        /// The value that was rejected.
        value: u64,
        /// Largest encodable value.
        max: u64,
    },

    /// A recursive structure nested deeper than the decoder allows.
    #[error("nesting exceeds limit of {limit} levels")]
    NestingTooDeep {
        /// Maximum nesting depth.
        limit: usize,
    },
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_message_mentions_counts() {
        let err = CodecError::Overflow { requested: 4, available: 1 };
        let msg = err.to_string();
        assert!(msg.contains("4 bytes"));
        assert!(msg.contains("1 bytes"));
    }

    #[test]
    fn test_underrun_message_mentions_counts() {
        let err = CodecError::Underrun { requested: 4, available: 3 };
        let msg = err.to_string();
        assert!(msg.contains("read 4"));
        assert!(msg.contains("3 bytes remain"));
    }

    #[test]
    fn test_invalid_tag_is_hex() {
        let err = CodecError::InvalidTag { tag: 0x2a };
        assert_eq!(err.to_string(), "invalid tag: 0x2a");
    }
}
