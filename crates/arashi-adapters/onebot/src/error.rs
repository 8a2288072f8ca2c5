//! Error types for building OneBot v11 messages.
//!
//! Segment constructors are total over their documented inputs. The only
//! failures come from inputs the platform cannot interpret: a path that
//! cannot be made absolute, a byte stream that fails mid-read, or a
//! structured payload that refuses to serialize.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building message segments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The path could not be resolved to a `file://` URI.
    #[error("invalid file path '{}': {reason}", .path.display())]
    InvalidPath {
        /// The path as supplied by the caller.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Reading a byte stream failed.
    #[error("failed to read stream: {0}")]
    StreamRead(String),

    /// A structured payload could not be serialized to JSON text.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MessageError {
    /// Creates an invalid path error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for MessageError {
    fn from(err: std::io::Error) -> Self {
        Self::StreamRead(err.to_string())
    }
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for message building operations.
pub type MessageResult<T> = Result<T, MessageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MessageError::invalid_path("", "empty path");
        assert_eq!(err.to_string(), "invalid file path '': empty path");

        let err: MessageError =
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();
        assert_eq!(err, MessageError::StreamRead("eof".to_string()));
    }
}
