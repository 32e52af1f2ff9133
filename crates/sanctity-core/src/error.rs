//! Core error types.

/// Errors produced while constructing core values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Input was not valid hexadecimal.
    #[error("invalid hex '{input}': {detail}")]
    InvalidHex { input: String, detail: String },

    /// Decoded bytes had the wrong length for a fixed-size value.
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
