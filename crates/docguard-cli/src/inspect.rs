//! # Inspect Subcommand
//!
//! Lists the document types a definitions file declares, in the order type
//! filters are tried.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use docguard_schema::{load_definitions_from_path, DocumentDefinitions, TypeFilter};

/// Arguments for the `docguard inspect` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Document definitions file (YAML, or JSON by extension).
    #[arg(long, value_name = "FILE")]
    pub definitions: PathBuf,
}

/// One line per document type: id, property count, type filter.
pub fn describe(definitions: &DocumentDefinitions) -> Vec<String> {
    definitions
        .iter()
        .map(|d| {
            let filter = match &d.type_filter {
                TypeFilter::Simple => "type property".to_string(),
                TypeFilter::IdPattern(pattern) => format!("id {pattern}"),
                TypeFilter::Custom(_) => "custom".to_string(),
            };
            let count = d.properties.len();
            let noun = if count == 1 { "property" } else { "properties" };
            format!("{}: {count} {noun} (matched by {filter})", d.type_id)
        })
        .collect()
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let definitions = load_definitions_from_path(&args.definitions)
        .with_context(|| format!("failed to load definitions from {}", args.definitions.display()))?;

    println!("Document types: {}", definitions.len());
    for line in describe(&definitions) {
        println!("  {line}");
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docguard_schema::{load_definitions_from_str, DefinitionFormat};

    #[test]
    fn describes_each_type_in_order() {
        let defs = load_definitions_from_str(
            "note:\n  propertyValidators:\n    body: { type: string }\nbiz:\n  typeFilter: { idPattern: 'biz\\.\\d+' }\n",
            DefinitionFormat::Yaml,
        )
        .unwrap();
        assert_eq!(
            describe(&defs),
            [
                "note: 1 property (matched by type property)",
                "biz: 0 properties (matched by id /biz\\.\\d+/)",
            ]
        );
    }
}
