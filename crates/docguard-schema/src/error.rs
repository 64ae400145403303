//! # Error Types
//!
//! Two families of failure leave this crate:
//!
//! - [`SchemaError`] means a document definition is broken: a computed
//!   constraint failed, a bound cannot be compared, a pattern does not
//!   compile, or a definition file is malformed. It is never caused by the
//!   data under validation.
//! - [`WriteRejection`] is the single external signal for a refused write.
//!   Every variant renders to the message the host reports to the client.

use std::path::PathBuf;

use thiserror::Error;

use crate::violation::ValidationErrors;

/// A constraint computation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ResolveError {
    message: String,
}

impl ResolveError {
    /// Create a resolve error with a description of what went wrong.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A defect in a document definition.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A computed constraint returned an error.
    #[error("constraint computation failed: {0}")]
    Resolve(#[from] ResolveError),

    /// A regular expression does not compile.
    #[error("invalid regular expression /{pattern}/: {reason}")]
    InvalidPattern {
        /// Pattern source as written.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// A range or equality bound cannot be compared with the validator's kind.
    #[error("{bound} is not a valid {kind} bound")]
    InvalidBound {
        /// Validator kind the bound was configured on.
        kind: &'static str,
        /// The offending bound, rendered as JSON.
        bound: String,
    },

    /// A validator names a type that does not exist.
    #[error("unknown validator type \"{type_name}\" at {location}")]
    UnknownValidatorType {
        /// The unrecognized type name.
        type_name: String,
        /// Dotted location of the validator within the definitions.
        location: String,
    },

    /// A definition is structurally invalid.
    #[error("malformed document definition at {location}: {reason}")]
    Malformed {
        /// Dotted location of the problem within the definitions.
        location: String,
        /// What is wrong.
        reason: String,
    },

    /// A definitions file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML syntax error.
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Classification of a rejection as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionSignal {
    /// The principal is identified but may not perform the write.
    Forbidden,
    /// The principal presented no identity.
    Unauthorized,
}

/// Why a write was refused.
#[derive(Error, Debug)]
pub enum WriteRejection {
    /// No document definition matches the document pair.
    #[error("Unknown document type")]
    UnknownDocumentType,

    /// An anonymous principal lacks access.
    #[error("{message}")]
    Unauthorized {
        /// Authorization failure description.
        message: String,
    },

    /// An identified principal lacks access.
    #[error("{message}")]
    Forbidden {
        /// Authorization failure description.
        message: String,
    },

    /// The document failed validation. Carries every violation found.
    #[error("Invalid {doc_type} document: {errors}")]
    Invalid {
        /// The matched document type.
        doc_type: String,
        /// All violations, in discovery order.
        errors: ValidationErrors,
    },

    /// A custom action refused the write.
    #[error("{message}")]
    HookRejected {
        /// The matched document type.
        doc_type: String,
        /// Message returned by the action.
        message: String,
    },

    /// The matched definition is broken.
    #[error("document definition error: {0}")]
    Misconfigured(#[from] SchemaError),
}

impl WriteRejection {
    /// How the host should classify the rejection.
    pub fn signal(&self) -> RejectionSignal {
        match self {
            Self::Unauthorized { .. } => RejectionSignal::Unauthorized,
            _ => RejectionSignal::Forbidden,
        }
    }

    /// Whether the rejection stems from a broken definition rather than
    /// from the write itself.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::Misconfigured(_))
    }
}
