//! # Document Definitions
//!
//! A [`DocumentDefinition`] describes one document type: how to recognize
//! it, who may write it, what its properties must look like, and which
//! attachments it accepts. Definitions are built once and shared read-only
//! by every validation call.

use std::fmt;
use std::sync::Arc;

use crate::attachment::AttachmentPolicy;
use crate::authorization::{AccessGrant, Authorization};
use crate::dispatch::TypeFilter;
use crate::resolvable::{ResolveContext, Resolvable};
use crate::validator::{Pattern, PropertyValidators};

/// Facts about the write handed to custom actions.
#[derive(Debug, Clone, Copy)]
pub struct ActionMetadata<'a> {
    pub document_type: &'a str,
    /// Resolved grants, once authorization has run.
    pub authorization: Option<&'a AccessGrant>,
}

/// Signature of a custom action. Returning `Err(message)` rejects the write.
pub type ActionFn = dyn Fn(&ResolveContext<'_>, &ActionMetadata<'_>) -> Result<(), String> + Send + Sync;

/// A lifecycle callback on a document definition.
#[derive(Clone)]
pub struct CustomAction(Arc<ActionFn>);

impl CustomAction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>, &ActionMetadata<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn run(&self, ctx: &ResolveContext<'_>, meta: &ActionMetadata<'_>) -> Result<(), String> {
        (self.0)(ctx, meta)
    }
}

impl fmt::Debug for CustomAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomAction(..)")
    }
}

/// Callbacks invoked as a write passes each stage.
#[derive(Debug, Clone, Default)]
pub struct CustomActions {
    pub on_type_identification_succeeded: Option<CustomAction>,
    pub on_authorization_succeeded: Option<CustomAction>,
    pub on_validation_succeeded: Option<CustomAction>,
}

/// The schema for one document type.
#[derive(Debug, Clone)]
pub struct DocumentDefinition {
    pub type_id: String,
    pub type_filter: TypeFilter,
    pub properties: PropertyValidators,
    pub authorization: Authorization,
    pub attachments: AttachmentPolicy,
    pub cannot_replace: Resolvable<bool>,
    pub cannot_delete: Resolvable<bool>,
    /// Equivalent to both `cannot_replace` and `cannot_delete`.
    pub immutable: Resolvable<bool>,
    /// Checked against `_id` on creation only.
    pub document_id_regex_pattern: Option<Resolvable<Pattern>>,
    /// Accept undeclared top-level properties.
    pub allow_unknown_properties: Resolvable<bool>,
    pub custom_actions: CustomActions,
}

impl DocumentDefinition {
    /// A definition recognized by the `type` property, with no properties
    /// declared and no grants.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            type_filter: TypeFilter::Simple,
            properties: PropertyValidators::default(),
            authorization: Authorization::default(),
            attachments: AttachmentPolicy::default(),
            cannot_replace: false.into(),
            cannot_delete: false.into(),
            immutable: false.into(),
            document_id_regex_pattern: None,
            allow_unknown_properties: false.into(),
            custom_actions: CustomActions::default(),
        }
    }

    pub fn with_type_filter(mut self, filter: TypeFilter) -> Self {
        self.type_filter = filter;
        self
    }

    pub fn with_properties(mut self, properties: PropertyValidators) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_attachments(mut self, attachments: AttachmentPolicy) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_custom_actions(mut self, actions: CustomActions) -> Self {
        self.custom_actions = actions;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true.into();
        self
    }

    pub fn cannot_replace(mut self) -> Self {
        self.cannot_replace = true.into();
        self
    }

    pub fn cannot_delete(mut self) -> Self {
        self.cannot_delete = true.into();
        self
    }
}

/// Every document definition, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DocumentDefinitions {
    definitions: Vec<DocumentDefinition>,
}

impl DocumentDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. A later definition with an existing type id
    /// replaces the earlier one in place.
    pub fn define(mut self, definition: DocumentDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn insert(&mut self, definition: DocumentDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|d| d.type_id == definition.type_id)
        {
            Some(slot) => *slot = definition,
            None => self.definitions.push(definition),
        }
    }

    pub fn get(&self, type_id: &str) -> Option<&DocumentDefinition> {
        self.definitions.iter().find(|d| d.type_id == type_id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DocumentDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<DocumentDefinition> for DocumentDefinitions {
    fn from_iter<I: IntoIterator<Item = DocumentDefinition>>(iter: I) -> Self {
        let mut defs = Self::new();
        for d in iter {
            defs.insert(d);
        }
        defs
    }
}

impl<'a> IntoIterator for &'a DocumentDefinitions {
    type Item = &'a DocumentDefinition;
    type IntoIter = std::slice::Iter<'a, DocumentDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}
