//! # Validation Errors
//!
//! A [`ValidationError`] pairs a property path with a [`Violation`].
//! Errors accumulate in discovery order and are never deduplicated; the
//! whole list is reported in one rejection.

use std::fmt;

use docguard_core::value::display_plain;
use serde_json::Value;

use crate::validator::{DataType, Pattern};

/// What is wrong with a value or document.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    /// The value is not of the declared kind.
    WrongType(DataType),
    Required,
    MustNotBeEmpty,
    /// The property is neither declared nor reserved metadata.
    Unsupported,
    /// The value differs from the prior revision.
    Immutable,
    PatternMismatch(String),
    MustEqual(Value),
    NotPredefined(Vec<Value>),
    BelowMinimum(Value),
    NotAboveExclusiveMinimum(Value),
    AboveMaximum(Value),
    NotBelowExclusiveMaximum(Value),
    TooShort(u64),
    TooLong(u64),
    TooFewEntries(u64),
    TooManyEntries(u64),
    EmptyKey,
    KeyPatternMismatch { key: String, pattern: String },
    UnsupportedExtension(Vec<String>),
    UnsupportedContentType(Vec<String>),
    AttachmentTooLarge(u64),

    // Document-level violations, reported without a path.
    CannotReplace,
    CannotDelete,
    CannotReplaceOrDelete,
    DocumentIdMismatch(String),
    AttachmentsNotAllowed,
    TooManyAttachments(u64),
    AttachmentExceedsSize { filename: String, maximum: u64 },
    AttachmentsExceedTotalSize(u64),
    AttachmentExtension { filename: String, supported: Vec<String> },
    AttachmentContentType { filename: String, supported: Vec<String> },
    AttachmentFilename { filename: String, pattern: String },
    UnreferencedAttachment(String),

    /// Message produced by a custom validation, reported verbatim.
    Custom(String),
}

impl Violation {
    pub(crate) fn pattern(pattern: &Pattern) -> Self {
        Self::PatternMismatch(pattern.source().to_string())
    }
}

fn join_plain(values: &[Value]) -> String {
    values.iter().map(display_plain).collect::<Vec<_>>().join(",")
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType(ty) => f.write_str(ty.type_violation()),
            Self::Required => f.write_str("is required"),
            Self::MustNotBeEmpty => f.write_str("must not be empty"),
            Self::Unsupported => f.write_str("is not supported"),
            Self::Immutable => f.write_str("may not be modified"),
            Self::PatternMismatch(p) => write!(f, "must conform to expected format /{p}/"),
            Self::MustEqual(v) => write!(f, "must equal {v}"),
            Self::NotPredefined(values) => {
                write!(f, "must be one of the predefined values: {}", join_plain(values))
            }
            Self::BelowMinimum(b) => write!(f, "must not be less than {}", display_plain(b)),
            Self::NotAboveExclusiveMinimum(b) => write!(f, "must be greater than {}", display_plain(b)),
            Self::AboveMaximum(b) => write!(f, "must not be greater than {}", display_plain(b)),
            Self::NotBelowExclusiveMaximum(b) => write!(f, "must be less than {}", display_plain(b)),
            Self::TooShort(n) => write!(f, "must not be shorter than {n}"),
            Self::TooLong(n) => write!(f, "must not be longer than {n}"),
            Self::TooFewEntries(n) => write!(f, "must not have fewer than {n} entries"),
            Self::TooManyEntries(n) => write!(f, "must not have more than {n} entries"),
            Self::EmptyKey => f.write_str("must not contain an empty key"),
            Self::KeyPatternMismatch { key, pattern } => {
                write!(f, "key \"{key}\" must conform to expected format /{pattern}/")
            }
            Self::UnsupportedExtension(exts) => {
                write!(f, "must have a supported file extension ({})", exts.join(","))
            }
            Self::UnsupportedContentType(types) => {
                write!(f, "must have a supported content type ({})", types.join(","))
            }
            Self::AttachmentTooLarge(n) => write!(f, "must not be larger than {n} bytes"),
            Self::CannotReplace => f.write_str("documents of this type cannot be replaced"),
            Self::CannotDelete => f.write_str("documents of this type cannot be deleted"),
            Self::CannotReplaceOrDelete => {
                f.write_str("documents of this type cannot be replaced or deleted")
            }
            Self::DocumentIdMismatch(p) => write!(f, "document id must conform to expected format /{p}/"),
            Self::AttachmentsNotAllowed => f.write_str("document type does not support attachments"),
            Self::TooManyAttachments(n) => {
                write!(f, "the total number of attachments must not exceed {n}")
            }
            Self::AttachmentExceedsSize { filename, maximum } => {
                write!(f, "attachment \"{filename}\" must not exceed {maximum} bytes")
            }
            Self::AttachmentsExceedTotalSize(n) => {
                write!(f, "the total size of all attachments must not exceed {n} bytes")
            }
            Self::AttachmentExtension { filename, supported } => write!(
                f,
                "attachment \"{filename}\" must have a supported file extension ({})",
                supported.join(",")
            ),
            Self::AttachmentContentType { filename, supported } => write!(
                f,
                "attachment \"{filename}\" must have a supported content type ({})",
                supported.join(",")
            ),
            Self::AttachmentFilename { filename, pattern } => {
                write!(f, "attachment \"{filename}\" must conform to expected pattern /{pattern}/")
            }
            Self::UnreferencedAttachment(filename) => write!(
                f,
                "attachment \"{filename}\" must have a corresponding attachment reference property"
            ),
            Self::Custom(message) => f.write_str(message),
        }
    }
}

/// One violation, located at a property path when it concerns a property.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: Option<String>,
    pub violation: Violation,
}

impl ValidationError {
    /// A violation on the property at `path`.
    pub fn at(path: impl Into<String>, violation: Violation) -> Self {
        Self {
            path: Some(path.into()),
            violation,
        }
    }

    /// A violation on the document as a whole.
    pub fn document(violation: Violation) -> Self {
        Self {
            path: None,
            violation,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, &self.violation) {
            (_, Violation::Custom(message)) => f.write_str(message),
            (Some(path), violation) => write!(f, "property \"{path}\" {violation}"),
            (None, violation) => write!(f, "{violation}"),
        }
    }
}

/// Ordered collection of validation errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub(crate) fn at(&mut self, path: &str, violation: Violation) {
        self.errors.push(ValidationError::at(path, violation));
    }

    pub(crate) fn document(&mut self, violation: Violation) {
        self.errors.push(ValidationError::document(violation));
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    /// Each error rendered as its client-facing message.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn into_inner(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn property_messages() {
        let cases = [
            (ValidationError::at("businessLogoAttachment", Violation::WrongType(DataType::AttachmentReference)),
             "property \"businessLogoAttachment\" must be an attachment reference string"),
            (ValidationError::at("defaultInvoiceTemplate.templateId", Violation::MustNotBeEmpty),
             "property \"defaultInvoiceTemplate.templateId\" must not be empty"),
            (ValidationError::at("exclusiveRangeValidationProp", Violation::NotAboveExclusiveMinimum(json!(51))),
             "property \"exclusiveRangeValidationProp\" must be greater than 51"),
            (ValidationError::at("d", Violation::BelowMinimum(json!("2016-07-19"))),
             "property \"d\" must not be less than 2016-07-19"),
            (ValidationError::at("tz", Violation::MustEqual(json!("Z"))),
             "property \"tz\" must equal \"Z\""),
            (ValidationError::at("logo", Violation::UnsupportedExtension(vec!["png".into(), "gif".into()])),
             "property \"logo\" must have a supported file extension (png,gif)"),
            (ValidationError::at("h[]", Violation::KeyPatternMismatch { key: "b@d".into(), pattern: "\\w+".into() }),
             "property \"h[]\" key \"b@d\" must conform to expected format /\\w+/"),
        ];
        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn document_and_custom_messages() {
        assert_eq!(
            ValidationError::document(Violation::CannotReplaceOrDelete).to_string(),
            "documents of this type cannot be replaced or deleted"
        );
        assert_eq!(
            ValidationError::at("x", Violation::Custom("x is odd".into())).to_string(),
            "x is odd"
        );
    }

    #[test]
    fn aggregate_is_semicolon_joined() {
        let mut errors = ValidationErrors::new();
        errors.at("a", Violation::Required);
        errors.at("b", Violation::Unsupported);
        assert_eq!(errors.to_string(), "property \"a\" is required; property \"b\" is not supported");
        assert_eq!(errors.messages().len(), 2);
    }

    #[test]
    fn predefined_values_listing() {
        let v = Violation::NotPredefined(vec![json!("A"), json!(2)]);
        assert_eq!(v.to_string(), "must be one of the predefined values: A,2");
    }
}
