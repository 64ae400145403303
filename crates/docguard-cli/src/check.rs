//! # Check Subcommand
//!
//! Runs one write through the engine:
//!
//! ```text
//! docguard check --definitions defs.yaml --new doc.json --old prev.json \
//!     --user alice --role editor --channel SERVICE
//! ```
//!
//! The outcome is printed as a single JSON object. A rejection caused by a
//! broken definition is an operational error, not a rejection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;

use docguard_core::{Document, Principal, WriteContext};
use docguard_schema::{
    load_definitions_from_path, EngineOptions, HostConvention, RejectionSignal, ValidationEngine,
    WriteOutcome, WriteRejection, WriteRequest,
};

/// Host convention selectable on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Host {
    #[default]
    SyncGateway,
    CouchDb,
}

impl From<Host> for HostConvention {
    fn from(host: Host) -> Self {
        match host {
            Host::SyncGateway => HostConvention::SyncGateway,
            Host::CouchDb => HostConvention::CouchDb,
        }
    }
}

/// Arguments for the `docguard check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Document definitions file (YAML, or JSON by extension).
    #[arg(long, value_name = "FILE")]
    pub definitions: PathBuf,

    /// Proposed revision. Omit to delete a missing document.
    #[arg(long = "new", value_name = "FILE")]
    pub new_doc: Option<PathBuf>,

    /// Current revision.
    #[arg(long = "old", value_name = "FILE")]
    pub old_doc: Option<PathBuf>,

    /// Acting username; anonymous when omitted.
    #[arg(long)]
    pub user: Option<String>,

    /// Role held by the user. Repeatable.
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Channel the user can access. Repeatable.
    #[arg(long = "channel", value_name = "CHANNEL")]
    pub channels: Vec<String>,

    /// Act as a store administrator.
    #[arg(long)]
    pub admin: bool,

    /// Target database name, visible to computed constraints.
    #[arg(long)]
    pub database: Option<String>,

    /// Host convention; sets the default for administrator deletion of
    /// unknown document types.
    #[arg(long, value_enum, default_value_t = Host::SyncGateway)]
    pub host: Host,
}

/// JSON printed by `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub accepted: bool,
    #[serde(flatten)]
    pub outcome: Option<WriteOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CheckReport {
    fn accepted(outcome: WriteOutcome) -> Self {
        Self {
            accepted: true,
            outcome: Some(outcome),
            signal: None,
            message: None,
            errors: Vec::new(),
        }
    }

    fn rejected(rejection: &WriteRejection) -> Self {
        let signal = match rejection.signal() {
            RejectionSignal::Forbidden => "forbidden",
            RejectionSignal::Unauthorized => "unauthorized",
        };
        let errors = match rejection {
            WriteRejection::Invalid { errors, .. } => errors.messages(),
            _ => Vec::new(),
        };
        Self {
            accepted: false,
            outcome: None,
            signal: Some(signal),
            message: Some(rejection.to_string()),
            errors,
        }
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    Document::from_json_str(&text).with_context(|| format!("invalid document in {}", path.display()))
}

fn principal(args: &CheckArgs) -> Principal {
    let mut principal = match &args.user {
        Some(name) => Principal::user(name),
        None => Principal::anonymous(),
    };
    principal = principal.with_roles(&args.roles).with_channels(&args.channels);
    principal.admin = args.admin;
    principal
}

/// Decide the write described by `args`.
///
/// Operational failures (unreadable files, broken definitions) are errors;
/// a rejected write is a successful evaluation.
pub fn evaluate(args: &CheckArgs) -> Result<CheckReport> {
    let definitions = load_definitions_from_path(&args.definitions)
        .with_context(|| format!("failed to load definitions from {}", args.definitions.display()))?;
    tracing::info!(types = definitions.len(), "loaded document definitions");

    let engine = ValidationEngine::with_options(definitions, EngineOptions::for_host(args.host.into()));

    let mut context = WriteContext::new(principal(args));
    context.database = args.database.clone();

    let request = WriteRequest {
        new_doc: args.new_doc.as_deref().map(read_document).transpose()?,
        old_doc: args.old_doc.as_deref().map(read_document).transpose()?,
        context,
    };

    match engine.validate_write(&request) {
        Ok(outcome) => Ok(CheckReport::accepted(outcome)),
        Err(rejection) if rejection.is_misconfiguration() => {
            Err(anyhow::Error::new(rejection).context("document definitions are misconfigured"))
        }
        Err(rejection) => {
            tracing::info!(%rejection, "write rejected");
            Ok(CheckReport::rejected(&rejection))
        }
    }
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 accepted, 1 rejected.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let report = evaluate(args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.accepted { 0 } else { 1 })
}
