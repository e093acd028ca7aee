//! # Networking Error Types

use netmsg_core::CodecError;
use netmsg_shared::ConfigError;
use thiserror::Error;

/// Errors raised by transports.
#[derive(Error, Debug)]
pub enum NetError {
    /// Socket failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end or the local queue is gone.
    #[error("link disconnected")]
    Disconnected,

    /// The outbound queue is full.
    #[error("outbound queue full")]
    QueueFull,

    /// A frame announced a message larger than the configured maximum.
    #[error("message of {size} bytes exceeds limit of {limit}")]
    MessageTooLarge {
        /// Announced size.
        size: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Frame or message bytes could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Every player id has been handed out.
    #[error("no player ids left")]
    PlayerIdsExhausted,

    /// Transport configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for transport operations.
pub type NetResult<T> = Result<T, NetError>;

/// Errors raised by a [`MessageSession`](crate::MessageSession).
#[derive(Error, Debug)]
pub enum SessionError {
    /// A typed write overflowed or a typed read underran.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An operation that requires an active writer was called without one.
    #[error("{operation} called with no active write session")]
    NotWriting {
        /// Name of the offending operation.
        operation: &'static str,
    },

    /// The attached transport failed.
    #[error("transport failed: {0}")]
    Transport(#[from] NetError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_writing_names_operation() {
        let err = SessionError::NotWriting { operation: "end" };
        assert_eq!(err.to_string(), "end called with no active write session");
    }

    #[test]
    fn test_codec_error_is_transparent() {
        let err = SessionError::from(CodecError::Underrun { requested: 4, available: 3 });
        assert!(err.to_string().starts_with("underrun"));
    }

    #[test]
    fn test_message_too_large() {
        let err = NetError::MessageTooLarge { size: 9000, limit: 1200 };
        let msg = err.to_string();
        assert!(msg.contains("9000"));
        assert!(msg.contains("1200"));
    }
}
