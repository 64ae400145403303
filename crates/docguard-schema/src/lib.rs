//! # docguard-schema — Document Definitions & Write Validation
//!
//! Decides whether a proposed document write is acceptable. A set of
//! [`DocumentDefinitions`] describes the document types a store holds; the
//! [`ValidationEngine`] takes a [`WriteRequest`] (new revision, prior
//! revision, acting principal) and returns either a [`WriteOutcome`] or a
//! [`WriteRejection`] carrying every violation found.
//!
//! ## Stages (`engine`)
//!
//! - [`dispatch`] picks the definition whose type filter matches the write.
//! - [`authorization`] resolves channel, role and user grants for the
//!   operation and checks the principal against them.
//! - [`immutability`], [`walker`] and [`attachment`] collect violations of
//!   the replace/delete policy, the property tree and the attachment policy.
//!
//! ## Constraints (`validator`, `resolvable`)
//!
//! Every constraint value is a [`Resolvable`]: either a literal or a
//! function of the write evaluated at validation time. Definitions built
//! from YAML or JSON through [`loader`] carry literals only.
//!
//! ## Crate Policy
//!
//! - Depends only on `docguard-core` internally.
//! - Validation is pure: no I/O, no global state, identical inputs give
//!   identical outcomes in identical order.
//! - Violation messages are a stable contract; callers match on them.

pub mod attachment;
pub mod authorization;
pub mod definition;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod immutability;
pub mod loader;
pub mod resolvable;
pub mod types;
pub mod validator;
pub mod violation;
pub mod walker;

pub use attachment::{AttachmentConstraints, AttachmentPolicy};
pub use authorization::{AccessGrant, Authorization, Denial, DenialReason, GrantSet, Operation};
pub use definition::{ActionMetadata, CustomAction, CustomActions, DocumentDefinition, DocumentDefinitions};
pub use dispatch::TypeFilter;
pub use engine::{
    validate_document, EngineOptions, HostConvention, ValidationEngine, WriteOutcome, WriteRequest,
};
pub use error::{RejectionSignal, ResolveError, SchemaError, WriteRejection};
pub use loader::{load_definitions_from_path, load_definitions_from_str, DefinitionFormat};
pub use resolvable::{ResolveContext, Resolvable};
pub use validator::{
    ArrayConstraints, AttachmentReferenceConstraints, CustomValidation, DataType, EnumConstraints,
    HashtableConstraints, KeyValidator, LengthBounds, ObjectConstraints, Pattern, PropertyValidator,
    PropertyValidators, RangeBounds, StringConstraints, ValidatorKind,
};
pub use violation::{ValidationError, ValidationErrors, Violation};
