//! Error types for the reference image matcher

use std::path::PathBuf;
use thiserror::Error;

use crate::extractor::SchemeTag;

/// Result type alias for matcher operations
pub type Result<T> = std::result::Result<T, MatcherError>;

/// Error types that can occur while extracting, storing or matching
#[derive(Error, Debug)]
pub enum MatcherError {
    /// Bytes could not be decoded as a PNG image.
    #[error("Decode error ({source_name}): {reason}")]
    Decode { source_name: String, reason: String },

    #[error("Cannot read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The durable index file could not be read or written.
    #[error("Storage error ({}): {reason}", path.display())]
    Storage { path: PathBuf, reason: String },

    /// An operation was refused because its inputs would make it destructive.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error(
        "Index was built with scheme {found}, current extractor uses {expected}; \
         rebuild required"
    )]
    SchemeMismatch { expected: SchemeTag, found: SchemeTag },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Entry not found: {name}")]
    EntryNotFound { name: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MatcherError {
    pub(crate) fn decode(source_name: impl Into<String>, reason: impl ToString) -> Self {
        MatcherError::Decode {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MatcherError::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is local to one image and leaves the index intact.
    pub fn is_image_local(&self) -> bool {
        matches!(
            self,
            MatcherError::Decode { .. } | MatcherError::ImageRead { .. }
        )
    }
}
