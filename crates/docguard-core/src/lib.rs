//! # docguard-core — Foundational Types for docguard
//!
//! This crate is the leaf of the docguard workspace. It defines the value
//! types every write decision is made over: the document pair, the acting
//! principal, and the ISO 8601 temporal values that range and equality
//! constraints compare by magnitude rather than by text.
//!
//! ## Key Design Principles
//!
//! 1. **Documents are read-only views.** [`Document`] wraps a JSON object and
//!    exposes the reserved metadata (`_id`, `_rev`, `_deleted`, `_revisions`,
//!    `_attachments`) through typed accessors. Nothing in the workspace
//!    mutates a document under validation.
//!
//! 2. **One whitelist.** The reserved metadata names live in
//!    [`RESERVED_PROPERTIES`] and nowhere else.
//!
//! 3. **Temporal values normalize before they compare.** `2016-07-19T19:24:38.920-0700`
//!    and `2016-07-20T02:24:38.920Z` are the same instant; `Z`, `+00:00` and
//!    `-00:00` are the same time zone.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docguard-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod document;
pub mod error;
pub mod identity;
pub mod temporal;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use document::{AttachmentDescriptor, Document, RESERVED_PROPERTIES};
pub use error::{DocguardError, DocumentError, TemporalError};
pub use identity::{Principal, WriteContext, ADMIN_ROLE};
pub use temporal::{IsoDate, IsoDateTime, IsoTimeZone};
