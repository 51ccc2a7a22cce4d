use thiserror::Error;

/// Errors that can occur when talking to a performance monitor
#[derive(Error, Debug)]
pub enum OarlockError {
    /// Bluetooth Low Energy related errors
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    /// No performance monitor found during scanning
    #[error("performance monitor not found")]
    DeviceNotFound,

    /// Device connection failed
    #[error("failed to connect to device: {0}")]
    ConnectionFailed(String),

    /// Device disconnected unexpectedly
    #[error("device disconnected")]
    Disconnected,

    /// Frame checksum did not match the received checksum byte
    #[error("frame checksum mismatch: calculated {calculated:02X}, received {received:02X}")]
    ChecksumMismatch {
        /// Running XOR over the frame contents
        calculated: u8,
        /// Checksum byte carried by the frame
        received: u8,
    },

    /// A byte arrived that is not valid in the current parse state
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A response command id differed from the queued command it should answer
    #[error("response command {received:02X} does not match expected command {expected:02X}")]
    CommandMismatch {
        /// Command id the transaction expected next
        expected: u8,
        /// Command id the device actually returned
        received: u8,
    },

    /// No complete response frame arrived within the configured timeout
    #[error("no response within {timeout_ms}ms")]
    ResponseTimeout {
        /// Timeout that expired, in milliseconds
        timeout_ms: u64,
    },

    /// Transport write or read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// A single command's parameters exceed the frame payload capacity
    #[error("command of {size} bytes exceeds the frame capacity of {max} bytes")]
    OversizeCommand {
        /// Encoded size of the offending command
        size: usize,
        /// Maximum content bytes one frame can carry
        max: usize,
    },

    /// A response payload could not be decoded into the requested value
    #[error("failed to decode response: {0}")]
    DecodeError(String),

    /// Invalid command parameters
    #[error("invalid command parameters: {0}")]
    InvalidParameters(String),

    /// Protocol error outside the frame layer
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transaction was dropped before a response arrived
    #[error("transaction aborted before completion")]
    Aborted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Session log could not be serialized or deserialized
    #[error("session log error: {0}")]
    SessionLog(#[from] serde_json::Error),
}

/// Result type for oarlock operations
pub type Result<T> = std::result::Result<T, OarlockError>;

impl OarlockError {
    /// Check if this error indicates a connection issue
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Ble(_)
                | Self::ConnectionFailed(_)
                | Self::Disconnected
                | Self::DeviceNotFound
                | Self::Transport(_)
        )
    }

    /// Check if this error is recoverable by retrying the transaction
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResponseTimeout { .. }
                | Self::ChecksumMismatch { .. }
                | Self::MalformedFrame(_)
                | Self::CommandMismatch { .. }
        )
    }

    /// Duplicate this error so one failure can be delivered to every
    /// command waiting on the same transaction. Variants wrapping
    /// non-clonable sources are flattened into their message form.
    pub(crate) fn replicate(&self) -> Self {
        match self {
            Self::Ble(e) => Self::Transport(e.to_string()),
            Self::Io(e) => Self::Transport(e.to_string()),
            Self::SessionLog(e) => Self::Protocol(e.to_string()),
            Self::DeviceNotFound => Self::DeviceNotFound,
            Self::ConnectionFailed(s) => Self::ConnectionFailed(s.clone()),
            Self::Disconnected => Self::Disconnected,
            Self::ChecksumMismatch {
                calculated,
                received,
            } => Self::ChecksumMismatch {
                calculated: *calculated,
                received: *received,
            },
            Self::MalformedFrame(s) => Self::MalformedFrame(s.clone()),
            Self::CommandMismatch { expected, received } => Self::CommandMismatch {
                expected: *expected,
                received: *received,
            },
            Self::ResponseTimeout { timeout_ms } => Self::ResponseTimeout {
                timeout_ms: *timeout_ms,
            },
            Self::Transport(s) => Self::Transport(s.clone()),
            Self::OversizeCommand { size, max } => Self::OversizeCommand {
                size: *size,
                max: *max,
            },
            Self::DecodeError(s) => Self::DecodeError(s.clone()),
            Self::InvalidParameters(s) => Self::InvalidParameters(s.clone()),
            Self::Protocol(s) => Self::Protocol(s.clone()),
            Self::Aborted => Self::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let connection_error = OarlockError::ConnectionFailed("test".to_string());
        assert!(connection_error.is_connection_error());
        assert!(!connection_error.is_recoverable());

        let timeout_error = OarlockError::ResponseTimeout { timeout_ms: 500 };
        assert!(!timeout_error.is_connection_error());
        assert!(timeout_error.is_recoverable());

        let checksum_error = OarlockError::ChecksumMismatch {
            calculated: 0x12,
            received: 0x21,
        };
        assert!(checksum_error.is_recoverable());
        assert!(!checksum_error.is_connection_error());
    }

    #[test]
    fn test_error_display() {
        let error = OarlockError::CommandMismatch {
            expected: 0x7F,
            received: 0x91,
        };
        let error_string = format!("{error}");
        assert!(error_string.contains("7F"));
        assert!(error_string.contains("91"));
    }

    #[test]
    fn test_replicate_flattens_sources() {
        let io = OarlockError::Io(std::io::Error::other("pipe broke"));
        match io.replicate() {
            OarlockError::Transport(msg) => assert!(msg.contains("pipe broke")),
            other => panic!("unexpected replica: {other}"),
        }
    }
}
