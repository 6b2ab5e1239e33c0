//! Error handling and error types for the oblivtree engine.
//!
//! Recoverable failures (I/O, malformed serialized payloads) are surfaced
//! through [`OblivTreeError`] and the crate-wide [`Result`] alias. Caller
//! contract violations — reading metadata that was never computed,
//! mismatched result-buffer sizes, malformed tree arrays — are programmer
//! errors and panic instead; the panicking functions document this in their
//! `# Panics` sections.

use std::io;
use thiserror::Error;

/// Main error type for the oblivtree library.
#[derive(Error, Debug)]
pub enum OblivTreeError {
    /// Structurally invalid model data encountered outside the hot path,
    /// e.g. while rebuilding a model from a serialized payload.
    #[error("Model error: {message}")]
    Model { message: String },

    /// Model serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Serialized container carries an unsupported format version
    #[error("Format version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Version this build reads and writes
        expected: u32,
        /// Version found in the payload
        found: u32,
    },

    /// File I/O errors
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: io::Error,
    },

    /// Bincode payload encoding/decoding errors
    #[error("Bincode error: {source}")]
    Bincode {
        /// Underlying bincode error
        #[from]
        source: bincode::Error,
    },

    /// JSON encoding errors (model-info dumps)
    #[error("JSON error: {source}")]
    Json {
        /// Underlying serde_json error
        #[from]
        source: serde_json::Error,
    },
}

/// Type alias for Results using OblivTreeError
pub type Result<T> = std::result::Result<T, OblivTreeError>;

impl OblivTreeError {
    /// Create a model error
    pub fn model<S: Into<String>>(message: S) -> Self {
        OblivTreeError::Model {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        OblivTreeError::Serialization {
            message: message.into(),
        }
    }
}
