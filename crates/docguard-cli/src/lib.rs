//! # docguard-cli — Command-Line Interface
//!
//! Exercises the validation engine end to end from files on disk.
//!
//! ## Subcommands
//!
//! - `check` — decide one write and print the outcome as JSON
//! - `inspect` — list the document types a definitions file declares
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers take parsed arguments.
//! - Handlers delegate to `docguard-schema`; no validation logic here.
//! - Exit codes: 0 accepted, 1 rejected, 2 operational error.

pub mod check;
pub mod inspect;
