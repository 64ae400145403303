//! # Document Model
//!
//! A [`Document`] is a read-only view over one JSON object proposed for (or
//! already stored in) the document store. Besides its ordinary properties a
//! document carries reserved metadata that the store itself manages:
//!
//! | property       | meaning                                  |
//! |----------------|------------------------------------------|
//! | `_id`          | document identifier                      |
//! | `_rev`         | revision marker                          |
//! | `_deleted`     | deletion flag (tombstone)                |
//! | `_revisions`   | revision history                         |
//! | `_attachments` | attachment descriptors keyed by filename |
//!
//! Reserved properties are never reported as unsupported by the validator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DocguardError, DocumentError};
use crate::value::json_kind;

/// Metadata properties that every document may carry regardless of schema.
pub const RESERVED_PROPERTIES: [&str; 5] = ["_id", "_rev", "_deleted", "_revisions", "_attachments"];

/// Whether `name` is one of the [`RESERVED_PROPERTIES`].
pub fn is_reserved_property(name: &str) -> bool {
    RESERVED_PROPERTIES.contains(&name)
}

/// Metadata describing one attachment on a document.
///
/// Attachments are uploaded in a separate write from the document that
/// references them, so a descriptor may be absent even when a property
/// already names the file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    /// MIME type reported by the uploader.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Size of the attachment body in bytes.
    #[serde(default)]
    pub length: Option<u64>,
}

/// A JSON object under validation, with typed access to reserved metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    properties: Map<String, Value>,
    attachments: BTreeMap<String, AttachmentDescriptor>,
}

impl Document {
    /// Build a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotAnObject`] if `value` is not an object and
    /// [`DocumentError::MalformedAttachments`] if `_attachments` is present
    /// but is not a map of attachment descriptors.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let properties = match value {
            Value::Object(map) => map,
            other => {
                return Err(DocumentError::NotAnObject {
                    found: json_kind(&other),
                })
            }
        };

        let attachments = match properties.get("_attachments") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(raw @ Value::Object(_)) => serde_json::from_value(raw.clone()).map_err(|e| {
                DocumentError::MalformedAttachments {
                    reason: e.to_string(),
                }
            })?,
            Some(other) => {
                return Err(DocumentError::MalformedAttachments {
                    reason: format!("expected an object, found {}", json_kind(other)),
                })
            }
        };

        Ok(Self {
            properties,
            attachments,
        })
    }

    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`DocguardError::Serialization`] for text that is not JSON and
    /// [`DocguardError::Document`] for JSON that is not a document.
    pub fn from_json_str(text: &str) -> Result<Self, DocguardError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value)?)
    }

    /// The tombstone that stands in for an absent new document when a
    /// missing or already-deleted resource is deleted again.
    pub fn deletion_marker() -> Self {
        let mut properties = Map::new();
        properties.insert("_deleted".to_string(), Value::Bool(true));
        Self {
            properties,
            attachments: BTreeMap::new(),
        }
    }

    /// The document's own properties, metadata included.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Look up a top-level property by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// The `_id` metadata, if it is a string.
    pub fn id(&self) -> Option<&str> {
        self.get("_id").and_then(Value::as_str)
    }

    /// Whether the document is a deletion tombstone.
    pub fn is_deleted(&self) -> bool {
        matches!(self.get("_deleted"), Some(Value::Bool(true)))
    }

    /// Attachment descriptors keyed by filename, sorted by filename.
    pub fn attachments(&self) -> &BTreeMap<String, AttachmentDescriptor> {
        &self.attachments
    }

    /// Descriptor for a single attachment, if it has been uploaded.
    pub fn attachment(&self, filename: &str) -> Option<&AttachmentDescriptor> {
        self.attachments.get(filename)
    }
}


/// Whether a prior revision is missing or is itself a tombstone.
///
/// Such a revision does not count as "existing" for replace, delete and
/// immutability purposes.
pub fn is_missing_or_deleted(doc: Option<&Document>) -> bool {
    doc.map_or(true, Document::is_deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object_documents() {
        let err = Document::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err, DocumentError::NotAnObject { found: "array" });
    }

    #[test]
    fn exposes_reserved_metadata() {
        let doc = Document::from_value(json!({
            "_id": "biz.8",
            "_rev": "2-abc",
            "_deleted": true,
        }))
        .unwrap();
        assert_eq!(doc.id(), Some("biz.8"));
        assert_eq!(doc.get("_rev"), Some(&json!("2-abc")));
        assert!(doc.is_deleted());
    }

    #[test]
    fn parses_attachment_descriptors() {
        let doc = Document::from_value(json!({
            "_id": "biz.2",
            "_attachments": {
                "logo.gIf": { "content_type": "image/gif", "length": 2097152, "digest": "md5-x" }
            }
        }))
        .unwrap();
        let logo = doc.attachment("logo.gIf").unwrap();
        assert_eq!(logo.content_type.as_deref(), Some("image/gif"));
        assert_eq!(logo.length, Some(2_097_152));
        assert!(doc.attachment("missing.png").is_none());
    }

    #[test]
    fn parses_documents_from_json_text() {
        let doc = Document::from_json_str(r#"{ "_id": "n1", "body": "hi" }"#).unwrap();
        assert_eq!(doc.id(), Some("n1"));

        let err = Document::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, DocguardError::Serialization(_)));

        let err = Document::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(
            err,
            DocguardError::Document(DocumentError::NotAnObject { found: "array" })
        ));
    }

    #[test]
    fn rejects_malformed_attachments() {
        let err = Document::from_value(json!({ "_attachments": "nope" })).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedAttachments { .. }));
    }

    #[test]
    fn deletion_marker_is_deleted() {
        let marker = Document::deletion_marker();
        assert!(marker.is_deleted());
        assert!(marker.id().is_none());
        assert_eq!(marker.properties().len(), 1);
    }

    #[test]
    fn missing_or_deleted_prior_revisions() {
        let live = Document::from_value(json!({ "_id": "a" })).unwrap();
        let tombstone = Document::from_value(json!({ "_id": "a", "_deleted": true })).unwrap();
        assert!(is_missing_or_deleted(None));
        assert!(is_missing_or_deleted(Some(&tombstone)));
        assert!(!is_missing_or_deleted(Some(&live)));
    }

    #[test]
    fn reserved_property_whitelist() {
        for name in RESERVED_PROPERTIES {
            assert!(is_reserved_property(name));
        }
        assert!(!is_reserved_property("_private"));
        assert!(!is_reserved_property("type"));
    }
}
