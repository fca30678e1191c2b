//! Error types for hmsearch.

use thiserror::Error;

/// Errors that can occur while creating, opening or querying an index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HmSearchError {
    /// `hash_bits` is zero or not a multiple of 8.
    #[error("invalid hash bits {0}: must be a positive multiple of 8")]
    InvalidHashBits(u32),

    /// `max_error` is outside `1..hash_bits` or above the layout cap of 518.
    #[error("invalid max error {0}: must be positive, below hash_bits and at most 518")]
    InvalidMaxError(u32),

    /// An input hash does not have exactly `hash_bits / 8` bytes.
    #[error("invalid hash length: expected {expected} bytes, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    /// Index creation found an existing store at the target path.
    #[error("storage already exists: {0}")]
    StorageExists(String),

    /// Open found no store at the target path.
    #[error("storage missing: {0}")]
    StorageMissing(String),

    /// The underlying store reported an error; the message is passed through.
    #[error("storage error: {0}")]
    StorageIo(String),

    /// Settings records absent, empty or unparsable on open.
    #[error("corrupt settings: {0}")]
    CorruptSettings(String),

    /// Operation attempted on a closed handle.
    #[error("index is closed")]
    Closed,
}

/// Result type alias for hmsearch operations.
pub type Result<T> = std::result::Result<T, HmSearchError>;
