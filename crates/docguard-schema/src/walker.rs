//! # Property Tree Walker
//!
//! Walks a validator tree against a document's property tree, threading a
//! path and an error accumulator through explicit recursion.
//!
//! For each declared property, in declaration order:
//!
//! 1. custom validation
//! 2. immutability against the prior revision's counterpart
//! 3. `required` when absent, otherwise the kind check; a value of the
//!    wrong kind yields one violation and nothing else for that property
//! 4. emptiness, equality and kind-specific constraints
//! 5. recursion into objects, array elements and hashtable entries
//!
//! Then every own property that is neither declared nor reserved metadata
//! is reported as unsupported, in the order it appears in the document.
//!
//! Paths: `parent.child` for object members, `parent[i]` for array
//! elements, `parent[key]` for hashtable entries.

use std::collections::BTreeSet;

use docguard_core::document::is_reserved_property;
use docguard_core::value::values_equal;
use serde_json::{Map, Value};

use crate::attachment;
use crate::error::SchemaError;
use crate::immutability;
use crate::resolvable::ResolveContext;
use crate::types::{check_range, is_empty_value, matches_type, semantically_equal};
use crate::validator::{LengthBounds, PropertyValidator, PropertyValidators, ValidatorKind};
use crate::violation::{ValidationErrors, Violation};

/// Everything one walk produced.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub errors: ValidationErrors,
    /// Filenames named by attachment-reference properties.
    pub attachment_references: BTreeSet<String>,
}

/// Validate the top-level properties of `ctx.new_doc`.
pub fn walk(
    validators: &PropertyValidators,
    allow_unknown_properties: bool,
    ctx: ResolveContext<'_>,
) -> Result<WalkReport, SchemaError> {
    let mut walker = Walker {
        ctx,
        report: WalkReport::default(),
    };
    let object = ctx.new_doc.properties();
    let old_object = ctx.old_doc.map(|d| d.properties());
    walker.properties(validators, object, old_object, None, allow_unknown_properties)?;
    Ok(walker.report)
}

fn child_path(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{p}.{name}"),
        None => name.to_string(),
    }
}

enum Counted {
    Length,
    Entries,
}

struct Walker<'a> {
    ctx: ResolveContext<'a>,
    report: WalkReport,
}

impl<'a> Walker<'a> {
    fn push(&mut self, path: &str, violation: Violation) {
        self.report.errors.at(path, violation);
    }

    fn properties(
        &mut self,
        validators: &PropertyValidators,
        object: &'a Map<String, Value>,
        old_object: Option<&'a Map<String, Value>>,
        prefix: Option<&str>,
        allow_unknown: bool,
    ) -> Result<(), SchemaError> {
        for (name, validator) in validators.iter() {
            let path = child_path(prefix, name);
            let old = old_object.and_then(|o| o.get(name));
            self.item(validator, &path, object.get(name), old)?;
        }

        if !allow_unknown {
            for name in object.keys() {
                if !validators.contains(name) && !is_reserved_property(name) {
                    self.push(&child_path(prefix, name), Violation::Unsupported);
                }
            }
        }
        Ok(())
    }

    fn item(
        &mut self,
        validator: &PropertyValidator,
        path: &str,
        value: Option<&'a Value>,
        old_value: Option<&'a Value>,
    ) -> Result<(), SchemaError> {
        let item = self.ctx.with_item(value, old_value);

        if let Some(custom) = &validator.custom_validation {
            for message in custom.run(&item)? {
                self.push(path, Violation::Custom(message));
            }
        }

        if let Some(violation) = immutability::check_property(validator, &item)? {
            self.push(path, violation);
        }

        let Some(value) = value.filter(|v| !v.is_null()) else {
            if validator.required.resolve(&item)? {
                self.push(path, Violation::Required);
            }
            return Ok(());
        };

        let ty = validator.data_type();
        if !matches_type(ty, value) {
            self.push(path, Violation::WrongType(ty));
            return Ok(());
        }

        if validator.must_not_be_empty.resolve(&item)? && is_empty_value(value) {
            self.push(path, Violation::MustNotBeEmpty);
        }

        if let Some(slot) = &validator.must_equal {
            let expected = slot.resolve(&item)?;
            if !expected.is_null() && !semantically_equal(ty, value, &expected) {
                self.push(path, Violation::MustEqual(expected));
            }
        }

        self.kind(&validator.kind, path, value, old_value, &item)
    }

    fn kind(
        &mut self,
        kind: &ValidatorKind,
        path: &str,
        value: &'a Value,
        old_value: Option<&'a Value>,
        item: &ResolveContext<'a>,
    ) -> Result<(), SchemaError> {
        match kind {
            ValidatorKind::String(c) => {
                let text = value.as_str().unwrap_or_default();
                if let Some(slot) = &c.regex_pattern {
                    let pattern = slot.resolve(item)?;
                    if !pattern.is_match(text) {
                        self.push(path, Violation::pattern(&pattern));
                    }
                }
                self.bounds(&c.length, text.chars().count(), Counted::Length, path, item)?;
            }
            ValidatorKind::Date(range)
            | ValidatorKind::DateTime(range)
            | ValidatorKind::TimeZone(range)
            | ValidatorKind::Integer(range)
            | ValidatorKind::Float(range) => {
                for violation in check_range(kind.data_type(), range, value, item)? {
                    self.push(path, violation);
                }
            }
            ValidatorKind::Boolean | ValidatorKind::Any => {}
            ValidatorKind::Enum(c) => {
                let allowed = c.predefined_values.resolve(item)?;
                if !allowed.iter().any(|a| values_equal(a, value)) {
                    self.push(path, Violation::NotPredefined(allowed));
                }
            }
            ValidatorKind::Object(c) => {
                if let (Some(children), Some(object)) = (&c.properties, value.as_object()) {
                    let allow_unknown = c.allow_unknown_properties.resolve(item)?;
                    let old_object = old_value.and_then(Value::as_object);
                    self.properties(children, object, old_object, Some(path), allow_unknown)?;
                }
            }
            ValidatorKind::Array(c) => {
                let elements = value.as_array().map(Vec::as_slice).unwrap_or_default();
                self.bounds(&c.length, elements.len(), Counted::Length, path, item)?;
                if let Some(element_validator) = &c.elements {
                    let old_elements = old_value.and_then(Value::as_array);
                    for (i, element) in elements.iter().enumerate() {
                        let old = old_elements.and_then(|o| o.get(i));
                        let element_path = format!("{path}[{i}]");
                        self.item(element_validator, &element_path, Some(element), old)?;
                    }
                }
            }
            ValidatorKind::Hashtable(c) => {
                let Some(entries) = value.as_object() else {
                    return Ok(());
                };
                self.bounds(&c.size, entries.len(), Counted::Entries, path, item)?;
                let old_entries = old_value.and_then(Value::as_object);
                for (key, entry) in entries {
                    let entry_path = format!("{path}[{key}]");
                    if let Some(keys) = &c.keys {
                        if key.is_empty() && keys.must_not_be_empty.resolve(item)? {
                            self.push(path, Violation::EmptyKey);
                        }
                        if let Some(slot) = &keys.regex_pattern {
                            let pattern = slot.resolve(item)?;
                            if !pattern.is_match(key) {
                                self.push(
                                    &entry_path,
                                    Violation::KeyPatternMismatch {
                                        key: key.clone(),
                                        pattern: pattern.source().to_string(),
                                    },
                                );
                            }
                        }
                    }
                    if let Some(value_validator) = &c.values {
                        let old = old_entries.and_then(|o| o.get(key));
                        self.item(value_validator, &entry_path, Some(entry), old)?;
                    }
                }
            }
            ValidatorKind::AttachmentReference(c) => {
                let filename = value.as_str().unwrap_or_default();
                self.report.attachment_references.insert(filename.to_string());
                for violation in attachment::check_reference(c, filename, item)? {
                    self.push(path, violation);
                }
            }
        }
        Ok(())
    }

    fn bounds(
        &mut self,
        bounds: &LengthBounds,
        actual: usize,
        counted: Counted,
        path: &str,
        item: &ResolveContext<'a>,
    ) -> Result<(), SchemaError> {
        let actual = actual as u64;
        if let Some(slot) = &bounds.minimum {
            let minimum = slot.resolve(item)?;
            if actual < minimum {
                let violation = match counted {
                    Counted::Length => Violation::TooShort(minimum),
                    Counted::Entries => Violation::TooFewEntries(minimum),
                };
                self.push(path, violation);
            }
        }
        if let Some(slot) = &bounds.maximum {
            let maximum = slot.resolve(item)?;
            if actual > maximum {
                let violation = match counted {
                    Counted::Length => Violation::TooLong(maximum),
                    Counted::Entries => Violation::TooManyEntries(maximum),
                };
                self.push(path, violation);
            }
        }
        Ok(())
    }
}
