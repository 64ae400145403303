//! # Document Type Dispatch
//!
//! Definitions are tried in declaration order and the first whose
//! [`TypeFilter`] accepts the document pair wins.

use std::fmt;
use std::sync::Arc;

use docguard_core::Document;
use serde_json::Value;
use tracing::debug;

use crate::definition::{DocumentDefinition, DocumentDefinitions};
use crate::validator::Pattern;

/// Signature of a custom type predicate: `(new, old, type_id)`.
pub type TypePredicate = dyn Fn(&Document, Option<&Document>, &str) -> bool + Send + Sync;

/// How a definition recognizes its documents.
#[derive(Clone)]
pub enum TypeFilter {
    /// Match the `type` property against the type id. On deletion the prior
    /// revision's type decides; on replacement both revisions must agree.
    Simple,
    /// Match `_id` against a pattern, falling back to the prior revision's
    /// `_id` when the new revision carries none.
    IdPattern(Pattern),
    /// Arbitrary predicate.
    Custom(Arc<TypePredicate>),
}

impl TypeFilter {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Document, Option<&Document>, &str) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Whether the pair belongs to `type_id`. `old_doc` must already exclude
    /// deleted revisions.
    pub fn matches(&self, new_doc: &Document, old_doc: Option<&Document>, type_id: &str) -> bool {
        match self {
            Self::Simple => simple_type_matches(new_doc, old_doc, type_id),
            Self::IdPattern(pattern) => new_doc
                .id()
                .or_else(|| old_doc.and_then(Document::id))
                .is_some_and(|id| pattern.is_match(id)),
            Self::Custom(f) => f(new_doc, old_doc, type_id),
        }
    }
}

fn type_of(doc: &Document) -> Option<&Value> {
    doc.get("type")
}

fn simple_type_matches(new_doc: &Document, old_doc: Option<&Document>, type_id: &str) -> bool {
    let is_candidate = |v: Option<&Value>| v.and_then(Value::as_str) == Some(type_id);
    match old_doc {
        Some(old) if new_doc.is_deleted() => is_candidate(type_of(old)),
        Some(old) => type_of(new_doc) == type_of(old) && is_candidate(type_of(old)),
        None => is_candidate(type_of(new_doc)),
    }
}

impl fmt::Debug for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => f.write_str("Simple"),
            Self::IdPattern(p) => f.debug_tuple("IdPattern").field(p).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// The first definition that claims the pair.
pub fn identify<'d>(
    definitions: &'d DocumentDefinitions,
    new_doc: &Document,
    old_doc: Option<&Document>,
) -> Option<&'d DocumentDefinition> {
    let found = definitions
        .iter()
        .find(|d| d.type_filter.matches(new_doc, old_doc, &d.type_id));
    debug!(
        doc_id = new_doc.id().or_else(|| old_doc.and_then(Document::id)),
        doc_type = found.map(|d| d.type_id.as_str()),
        "document type identification"
    );
    found
}
