//! Protocol errors

use thiserror::Error;

/// Errors raised while pulling frames from the transport
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("No frame terminator received before timeout")]
    Timeout,

    #[error("Frame exceeded {limit} bytes without a terminator")]
    FrameTooLong { limit: usize },

    #[error("Device disconnected (end of stream)")]
    Disconnected,

    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    /// Whether the error ends the acquisition loop
    ///
    /// Timeouts and oversize frames only cost one cycle; the rest mean the
    /// transport is gone.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AcquisitionError::Timeout | AcquisitionError::FrameTooLong { .. }
        )
    }
}

/// Frame-level parse failure; every acquired channel is affected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame is not valid UTF-8 (invalid byte at offset {offset})")]
    Decode { offset: usize },
}

/// Per-channel parse or validation failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record missing from frame")]
    MissingRecord,

    #[error("Record is empty")]
    EmptyRecord,

    #[error("Wrong record tag: expected '{expected}', got '{found}'")]
    WrongTag { expected: char, found: String },

    #[error("Field {index} is not an integer: '{field}'")]
    NonNumeric { index: usize, field: String },

    #[error("Sample count mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_recoverable() {
        assert!(!AcquisitionError::Timeout.is_fatal());
        assert!(!AcquisitionError::FrameTooLong { limit: 16 }.is_fatal());
    }

    #[test]
    fn test_transport_errors_are_fatal() {
        assert!(AcquisitionError::Disconnected.is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(AcquisitionError::from(io).is_fatal());
    }

    #[test]
    fn test_record_error_display() {
        let err = RecordError::LengthMismatch {
            expected: 400,
            actual: 399,
        };
        assert_eq!(
            err.to_string(),
            "Sample count mismatch: expected 400, got 399"
        );
    }
}
