//! Error types for payload decoding.

use thiserror::Error;

/// Result type for decoder operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error types for OPeNDAP payload decoding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// No coordinate axes or no samples; the timestep counts as missing.
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// Structurally broken payload
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Recognised construct we deliberately do not decode (DAP2 Sequences)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Buffer ended before a declared field
    #[error("Truncated buffer: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Staging a NetCDF payload on disk failed
    #[error("I/O error: {0}")]
    IoError(String),

    /// One variable of an otherwise valid payload could not be read
    #[error("Variable '{variable}' could not be decoded: {reason}")]
    PartialVariableFailure { variable: String, reason: String },
}

impl DecodeError {
    /// Whether re-fetching the same timestep might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DecodeError::EmptyResponse(_) | DecodeError::Truncated { .. }
        )
    }
}
