// Error types for loading and persisting reference data
//
// Build and validation findings are NOT errors - they are collected as
// diagnostics (see diagnostics.rs). These errors only cover input that
// cannot be read at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefixError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON or a field with the wrong shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Entity id that is not a 1-3 digit number
    #[error("invalid entity id '{0}'")]
    InvalidEntityId(String),
    /// Rule that cannot be represented (empty prefix and similar)
    #[error("invalid rule '{prefix}': {reason}")]
    InvalidRule { prefix: String, reason: String },
    /// Catalog snapshot violates its own invariants
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

pub type Result<T> = std::result::Result<T, PrefixError>;
