//! # Validation Engine
//!
//! [`ValidationEngine::validate_write`] is the per-write decision function.
//! It is pure and synchronous: no I/O, no shared mutable state, identical
//! inputs produce identical outcomes. An engine may be shared across
//! threads and called concurrently.
//!
//! ## Pipeline
//!
//! ```text
//! identify type ─► on_type_identification_succeeded
//!      │
//!      ▼
//! authorize ─► on_authorization_succeeded
//!      │
//!      ▼
//! document policy (always) + property walk and attachment policy (unless deleting)
//!      │
//!      ▼
//! accept ─► on_validation_succeeded        or        reject with every violation
//! ```
//!
//! A write with no matching definition is rejected as an unknown type,
//! except that an administrator may delete it when
//! [`EngineOptions::allow_admin_unknown_type_deletion`] is set.

use std::sync::Arc;

use docguard_core::document::is_missing_or_deleted;
use docguard_core::{Document, WriteContext};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::attachment;
use crate::authorization::{AccessGrant, Operation};
use crate::definition::{ActionMetadata, CustomAction, DocumentDefinition, DocumentDefinitions};
use crate::dispatch::identify;
use crate::error::{SchemaError, WriteRejection};
use crate::immutability;
use crate::resolvable::ResolveContext;
use crate::violation::{ValidationErrors, Violation};
use crate::walker::walk;

/// The host a set of definitions is deployed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostConvention {
    /// Sync-gateway style replication host.
    #[default]
    SyncGateway,
    /// Document-database style host with a native administrator role.
    CouchDb,
}

/// Engine policy switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Let an administrator delete a document no definition recognizes.
    pub allow_admin_unknown_type_deletion: bool,
}

impl EngineOptions {
    /// Defaults for a host convention.
    pub fn for_host(host: HostConvention) -> Self {
        match host {
            HostConvention::SyncGateway => Self {
                allow_admin_unknown_type_deletion: false,
            },
            HostConvention::CouchDb => Self {
                allow_admin_unknown_type_deletion: true,
            },
        }
    }

    pub fn with_admin_unknown_type_deletion(mut self, allow: bool) -> Self {
        self.allow_admin_unknown_type_deletion = allow;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::for_host(HostConvention::default())
    }
}

/// One write attempt.
#[derive(Debug, Clone, Default)]
pub struct WriteRequest {
    /// Proposed revision. `None` deletes a missing or already-deleted document.
    pub new_doc: Option<Document>,
    /// Current revision, if any.
    pub old_doc: Option<Document>,
    pub context: WriteContext,
}

impl WriteRequest {
    pub fn new(new_doc: Document) -> Self {
        Self {
            new_doc: Some(new_doc),
            ..Self::default()
        }
    }

    /// Delete `old_doc`.
    pub fn deletion(old_doc: Document) -> Self {
        Self {
            new_doc: Some(Document::deletion_marker()),
            old_doc: Some(old_doc),
            ..Self::default()
        }
    }

    pub fn replacing(mut self, old_doc: Document) -> Self {
        self.old_doc = Some(old_doc);
        self
    }

    pub fn with_context(mut self, context: WriteContext) -> Self {
        self.context = context;
        self
    }
}

/// An accepted write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    /// `None` when an administrator deleted a document of unknown type.
    pub doc_type: Option<String>,
    pub operation: Operation,
    /// Channels that authorize this operation.
    pub required_channels: Vec<String>,
    /// Every channel the document is assigned to.
    pub channels: Vec<String>,
}

/// Validates writes against a set of document definitions.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    definitions: Arc<DocumentDefinitions>,
    options: EngineOptions,
}

impl ValidationEngine {
    pub fn new(definitions: DocumentDefinitions) -> Self {
        Self::with_options(definitions, EngineOptions::default())
    }

    pub fn with_options(definitions: DocumentDefinitions, options: EngineOptions) -> Self {
        Self {
            definitions: Arc::new(definitions),
            options,
        }
    }

    pub fn definitions(&self) -> &DocumentDefinitions {
        &self.definitions
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Decide one write.
    ///
    /// # Errors
    ///
    /// Every refusal is a [`WriteRejection`]; a broken definition surfaces
    /// as [`WriteRejection::Misconfigured`].
    pub fn validate_write(&self, request: &WriteRequest) -> Result<WriteOutcome, WriteRejection> {
        let marker;
        let new_doc = match &request.new_doc {
            Some(doc) => doc,
            None => {
                marker = Document::deletion_marker();
                &marker
            }
        };
        let old_doc = request
            .old_doc
            .as_ref()
            .filter(|d| !is_missing_or_deleted(Some(*d)));
        let principal = &request.context.principal;
        let ctx = ResolveContext::new(new_doc, old_doc, principal, request.context.database.as_deref());

        let Some(definition) = identify(&self.definitions, new_doc, old_doc) else {
            if new_doc.is_deleted() && principal.is_admin() && self.options.allow_admin_unknown_type_deletion {
                warn!(
                    doc_id = new_doc.id().or_else(|| request.old_doc.as_ref().and_then(Document::id)),
                    user = principal.name.as_deref(),
                    "administrator deleting document of unknown type"
                );
                return Ok(WriteOutcome {
                    doc_type: None,
                    operation: Operation::Remove,
                    required_channels: Vec::new(),
                    channels: Vec::new(),
                });
            }
            return Err(WriteRejection::UnknownDocumentType);
        };
        let doc_type = definition.type_id.as_str();

        run_action(
            &definition.custom_actions.on_type_identification_succeeded,
            &ctx,
            &ActionMetadata {
                document_type: doc_type,
                authorization: None,
            },
        )?;

        let operation = Operation::classify(new_doc, old_doc);
        let grant = definition.authorization.resolve(operation, &ctx)?;
        if let Err(denial) = grant.check(principal) {
            let message = denial.reason.to_string();
            return Err(if denial.anonymous {
                WriteRejection::Unauthorized { message }
            } else {
                WriteRejection::Forbidden { message }
            });
        }

        let meta = ActionMetadata {
            document_type: doc_type,
            authorization: Some(&grant),
        };
        run_action(&definition.custom_actions.on_authorization_succeeded, &ctx, &meta)?;

        let errors = validate_document(definition, operation, &ctx)?;
        if !errors.is_empty() {
            debug!(doc_type, count = errors.len(), "document rejected");
            return Err(WriteRejection::Invalid {
                doc_type: doc_type.to_string(),
                errors,
            });
        }

        run_action(&definition.custom_actions.on_validation_succeeded, &ctx, &meta)?;

        debug!(doc_type, %operation, "write accepted");
        Ok(outcome(doc_type, grant))
    }
}

fn outcome(doc_type: &str, grant: AccessGrant) -> WriteOutcome {
    WriteOutcome {
        doc_type: Some(doc_type.to_string()),
        operation: grant.operation,
        required_channels: grant.channels.unwrap_or_default(),
        channels: grant.assigned_channels,
    }
}

fn run_action(
    action: &Option<CustomAction>,
    ctx: &ResolveContext<'_>,
    meta: &ActionMetadata<'_>,
) -> Result<(), WriteRejection> {
    let Some(action) = action else {
        return Ok(());
    };
    action.run(ctx, meta).map_err(|message| {
        warn!(doc_type = meta.document_type, %message, "custom action rejected write");
        WriteRejection::HookRejected {
            doc_type: meta.document_type.to_string(),
            message,
        }
    })
}

/// Every violation of `definition` by the write, in reporting order:
/// document id, replace/delete policy, properties, attachments.
pub fn validate_document(
    definition: &DocumentDefinition,
    operation: Operation,
    ctx: &ResolveContext<'_>,
) -> Result<ValidationErrors, SchemaError> {
    let mut errors = ValidationErrors::new();

    if operation == Operation::Add {
        if let Some(slot) = &definition.document_id_regex_pattern {
            let pattern = slot.resolve(ctx)?;
            if !ctx.new_doc.id().is_some_and(|id| pattern.is_match(id)) {
                errors.document(Violation::DocumentIdMismatch(pattern.source().to_string()));
            }
        }
    }

    if let Some(violation) = immutability::check_document(definition, operation, ctx)? {
        errors.document(violation);
    }

    if operation != Operation::Remove {
        let allow_unknown = definition.allow_unknown_properties.resolve(ctx)?;
        let report = walk(&definition.properties, allow_unknown, *ctx)?;
        for error in report.errors.into_inner() {
            errors.push(error);
        }
        attachment::check_document(&definition.attachments, &report.attachment_references, ctx, &mut errors)?;
    }

    Ok(errors)
}
