//! Error types for hypernotes
//!
//! Store-level failures carry enough context to tell the caller what to do next.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// hypernotes error types
#[derive(Error, Debug)]
pub enum Error {
    /// A note with this identifier is already stored (or repeated in one batch)
    #[error("Duplicate identifier: {0}\nThe note was not stored. Use update to change an existing note.")]
    DuplicateIdentifier(String),

    /// One or more identifiers are not present in the store
    #[error("Unknown identifier(s): {}\nNothing was written. Use add for notes that are not stored yet.", .0.join(", "))]
    UnknownIdentifier(Vec<String>),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Loaded content does not describe a note
    #[error("Invalid note content: {0}")]
    InvalidContent(String),

    /// Timestamp string does not follow `YYYY-MM-DDTHH-MM-SS`
    #[error("Invalid timestamp '{0}': expected YYYY-MM-DDTHH-MM-SS")]
    InvalidTimestamp(String),

    /// Configuration file or environment override is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}
