//! # Constraint Resolution
//!
//! Every configuration slot of a document definition is a [`Resolvable`]:
//! either a literal fixed when the definition is built, or a computation
//! over the write being validated. Computations run on every call; nothing
//! is cached, since the same slot may legitimately differ between the new
//! and the prior revision of a document.
//!
//! A computation that fails signals a broken definition, not bad data, and
//! surfaces as [`SchemaError::Resolve`](crate::SchemaError::Resolve).

use std::fmt;
use std::sync::Arc;

use docguard_core::{Document, Principal};
use serde_json::Value;

use crate::error::ResolveError;

/// Inputs visible to a computed constraint.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// The proposed document.
    pub new_doc: &'a Document,
    /// The live prior revision, if any.
    pub old_doc: Option<&'a Document>,
    /// The acting principal.
    pub principal: &'a Principal,
    /// Identifier of the store the write targets.
    pub database: Option<&'a str>,
    /// For property-level slots: the value under validation.
    pub value: Option<&'a Value>,
    /// For property-level slots: the counterpart value in the prior revision.
    pub old_value: Option<&'a Value>,
}

impl<'a> ResolveContext<'a> {
    /// A document-level context with no property slot.
    pub fn new(
        new_doc: &'a Document,
        old_doc: Option<&'a Document>,
        principal: &'a Principal,
        database: Option<&'a str>,
    ) -> Self {
        Self {
            new_doc,
            old_doc,
            principal,
            database,
            value: None,
            old_value: None,
        }
    }

    /// The same context narrowed to one property's value pair.
    pub fn with_item<'b>(
        &self,
        value: Option<&'b Value>,
        old_value: Option<&'b Value>,
    ) -> ResolveContext<'b>
    where
        'a: 'b,
    {
        ResolveContext {
            new_doc: self.new_doc,
            old_doc: self.old_doc,
            principal: self.principal,
            database: self.database,
            value,
            old_value,
        }
    }

    /// Whether a live prior revision exists.
    pub fn has_old_doc(&self) -> bool {
        self.old_doc.is_some()
    }
}

/// Signature of a computed constraint.
pub type ComputeFn<T> = dyn Fn(&ResolveContext<'_>) -> Result<T, ResolveError> + Send + Sync;

/// A configuration value that is either literal or computed per write.
pub enum Resolvable<T> {
    /// Fixed value.
    Literal(T),
    /// Computed on every resolution.
    Computed(Arc<ComputeFn<T>>),
}

impl<T: Clone> Resolvable<T> {
    /// Wrap an infallible computation.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> T + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(move |ctx: &ResolveContext<'_>| Ok(f(ctx))))
    }

    /// Wrap a computation that may fail.
    pub fn try_computed<F>(f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self::Computed(Arc::new(f))
    }

    /// Produce the concrete value for this write.
    pub fn resolve(&self, ctx: &ResolveContext<'_>) -> Result<T, ResolveError> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Computed(f) => f(ctx),
        }
    }

    /// The literal value, if this slot is not computed.
    pub fn as_literal(&self) -> Option<&T> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Computed(_) => None,
        }
    }
}

impl<T> From<T> for Resolvable<T> {
    fn from(value: T) -> Self {
        Self::Literal(value)
    }
}

impl<T: Default> Default for Resolvable<T> {
    fn default() -> Self {
        Self::Literal(T::default())
    }
}

impl<T: Clone> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Computed(f) => Self::Computed(Arc::clone(f)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resolvable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
