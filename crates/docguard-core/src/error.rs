//! # Error Types — Structured Error Hierarchy
//!
//! Defines the foundational error types used throughout docguard. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Document errors describe input that cannot be treated as a document at
//!   all (as opposed to a document that merely fails its schema).
//! - Temporal errors carry the offending text and the reason it was rejected.

use thiserror::Error;

/// Top-level error for turning raw input into a [`crate::Document`].
#[derive(Error, Debug)]
pub enum DocguardError {
    /// Input could not be interpreted as a document.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error constructing a [`crate::Document`] from raw JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Documents must be JSON objects.
    #[error("document must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON kind that was supplied instead.
        found: &'static str,
    },

    /// The `_attachments` metadata is not an object of attachment descriptors.
    #[error("malformed \"_attachments\" metadata: {reason}")]
    MalformedAttachments {
        /// Why the metadata was rejected.
        reason: String,
    },
}

/// Error parsing an ISO 8601 date, date/time or time zone string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemporalError {
    /// The text does not match the expected ISO 8601 shape.
    #[error("\"{value}\" is not a valid ISO 8601 {expected}")]
    Malformed {
        /// The string that failed to parse.
        value: String,
        /// Which temporal form was expected.
        expected: &'static str,
    },

    /// The text matches the shape but names a day or time that does not exist.
    #[error("\"{value}\" is out of range: {reason}")]
    OutOfRange {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}
