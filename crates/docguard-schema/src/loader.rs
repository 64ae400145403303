//! # Declarative Loader
//!
//! Reads literal document definitions from YAML or JSON. The top level maps
//! each type id to its definition; declaration order is preserved and is the
//! order type filters are tried in.
//!
//! ```yaml
//! business:
//!   typeFilter: { idPattern: 'biz\.\d+' }
//!   channels: { view: VIEW, write: [SERVICE] }
//!   allowAttachments: true
//!   propertyValidators:
//!     businessLogoAttachment:
//!       type: attachmentReference
//!       supportedExtensions: [png, gif]
//! ```
//!
//! Computed constraints and custom hooks have no file representation; build
//! those in code and merge them with [`DocumentDefinitions::insert`].

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::attachment::{AttachmentConstraints, AttachmentPolicy};
use crate::authorization::{Authorization, GrantSet};
use crate::definition::{DocumentDefinition, DocumentDefinitions};
use crate::dispatch::TypeFilter;
use crate::error::SchemaError;
use crate::resolvable::Resolvable;
use crate::types::is_valid_bound;
use crate::validator::{
    ArrayConstraints, AttachmentReferenceConstraints, DataType, EnumConstraints, HashtableConstraints,
    KeyValidator, LengthBounds, ObjectConstraints, Pattern, PropertyValidator, PropertyValidators,
    RangeBounds, StringConstraints, ValidatorKind,
};

/// Syntax of a definitions file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Yaml,
    Json,
}

impl DefinitionFormat {
    /// Guess from a file extension; anything but `.json` is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Parse definitions from text.
pub fn load_definitions_from_str(
    text: &str,
    format: DefinitionFormat,
) -> Result<DocumentDefinitions, SchemaError> {
    let root: Value = match format {
        DefinitionFormat::Yaml => serde_yaml::from_str(text)?,
        DefinitionFormat::Json => serde_json::from_str(text)?,
    };
    let Value::Object(types) = root else {
        return Err(malformed("(root)", "expected a mapping of document type ids to definitions"));
    };

    let mut definitions = DocumentDefinitions::new();
    for (type_id, raw) in types {
        let definition = build_definition(&type_id, raw)?;
        debug!(
            doc_type = %type_id,
            properties = definition.properties.len(),
            "loaded document definition"
        );
        definitions.insert(definition);
    }
    Ok(definitions)
}

/// Read and parse a definitions file.
pub fn load_definitions_from_path(path: &Path) -> Result<DocumentDefinitions, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_definitions_from_str(&text, DefinitionFormat::from_path(path))
}

fn malformed(location: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::Malformed {
        location: location.to_string(),
        reason: reason.into(),
    }
}

fn parse<T: serde::de::DeserializeOwned>(raw: Value, location: &str) -> Result<T, SchemaError> {
    serde_json::from_value(raw).map_err(|e| malformed(location, e.to_string()))
}

// ---------------------------------------------------------------------------
// Raw file shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGrantMap {
    view: Option<OneOrMany>,
    add: Option<OneOrMany>,
    replace: Option<OneOrMany>,
    remove: Option<OneOrMany>,
    write: Option<OneOrMany>,
}

/// A bare string or list is shorthand for a `write` grant.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawGrantSet {
    Write(OneOrMany),
    PerOperation(RawGrantMap),
}

impl From<RawGrantSet> for GrantSet {
    fn from(raw: RawGrantSet) -> Self {
        let list = |v: Option<OneOrMany>| v.map(OneOrMany::into_vec).unwrap_or_default();
        match raw {
            RawGrantSet::Write(entries) => GrantSet::write(entries.into_vec()),
            RawGrantSet::PerOperation(m) => GrantSet {
                view: list(m.view),
                add: list(m.add),
                replace: list(m.replace),
                remove: list(m.remove),
                write: list(m.write),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawIdPattern {
    id_pattern: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeFilter {
    Named(String),
    IdPattern(RawIdPattern),
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawAttachmentConstraints {
    maximum_attachment_count: Option<u64>,
    maximum_individual_size: Option<u64>,
    maximum_total_size: Option<u64>,
    supported_extensions: Option<Vec<String>>,
    supported_content_types: Option<Vec<String>>,
    filename_regex_pattern: Option<String>,
    #[serde(default)]
    require_attachment_references: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDefinition {
    type_filter: Option<RawTypeFilter>,
    channels: Option<RawGrantSet>,
    authorized_roles: Option<RawGrantSet>,
    authorized_users: Option<RawGrantSet>,
    #[serde(default)]
    grant_all_members_write_access: bool,
    #[serde(default)]
    cannot_replace: bool,
    #[serde(default)]
    cannot_delete: bool,
    #[serde(default)]
    immutable: bool,
    document_id_regex_pattern: Option<String>,
    #[serde(default)]
    allow_unknown_properties: bool,
    #[serde(default)]
    allow_attachments: bool,
    attachment_constraints: Option<RawAttachmentConstraints>,
    #[serde(default)]
    property_validators: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawKeyValidator {
    #[serde(default)]
    must_not_be_empty: bool,
    regex_pattern: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawValidator {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    must_not_be_empty: bool,
    #[serde(default)]
    immutable: bool,
    #[serde(default)]
    immutable_when_set: bool,
    must_equal: Option<Value>,
    minimum_value: Option<Value>,
    minimum_value_exclusive: Option<Value>,
    maximum_value: Option<Value>,
    maximum_value_exclusive: Option<Value>,
    regex_pattern: Option<String>,
    minimum_length: Option<u64>,
    maximum_length: Option<u64>,
    minimum_size: Option<u64>,
    maximum_size: Option<u64>,
    predefined_values: Option<Vec<Value>>,
    property_validators: Option<Map<String, Value>>,
    allow_unknown_properties: Option<bool>,
    array_elements_validator: Option<Value>,
    hashtable_keys_validator: Option<RawKeyValidator>,
    hashtable_values_validator: Option<Value>,
    supported_extensions: Option<Vec<String>>,
    supported_content_types: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn pattern(source: Option<String>) -> Result<Option<Resolvable<Pattern>>, SchemaError> {
    source.map(|s| Pattern::new(s).map(Resolvable::Literal)).transpose()
}

fn literal<T>(value: Option<T>) -> Option<Resolvable<T>> {
    value.map(Resolvable::Literal)
}

fn build_definition(type_id: &str, raw: Value) -> Result<DocumentDefinition, SchemaError> {
    let raw: RawDefinition = parse(raw, type_id)?;

    let type_filter = match raw.type_filter {
        None => TypeFilter::Simple,
        Some(RawTypeFilter::Named(name)) if name == "simple" => TypeFilter::Simple,
        Some(RawTypeFilter::Named(name)) => {
            return Err(malformed(type_id, format!("unknown type filter \"{name}\"")));
        }
        Some(RawTypeFilter::IdPattern(p)) => TypeFilter::IdPattern(Pattern::new(p.id_pattern)?),
    };

    let constraints = raw.attachment_constraints.unwrap_or_default();
    let attachments = AttachmentPolicy {
        allow_attachments: raw.allow_attachments.into(),
        constraints: AttachmentConstraints {
            maximum_attachment_count: literal(constraints.maximum_attachment_count),
            maximum_individual_size: literal(constraints.maximum_individual_size),
            maximum_total_size: literal(constraints.maximum_total_size),
            supported_extensions: literal(constraints.supported_extensions),
            supported_content_types: literal(constraints.supported_content_types),
            filename_regex_pattern: pattern(constraints.filename_regex_pattern)?,
            require_attachment_references: constraints.require_attachment_references.into(),
        },
    };

    let grant = |g: Option<RawGrantSet>| g.map(|g| Resolvable::Literal(GrantSet::from(g)));
    let authorization = Authorization {
        channels: grant(raw.channels),
        roles: grant(raw.authorized_roles),
        users: grant(raw.authorized_users),
        grant_all_members_write_access: raw.grant_all_members_write_access.into(),
    };

    Ok(DocumentDefinition {
        type_id: type_id.to_string(),
        type_filter,
        properties: build_properties(raw.property_validators, type_id)?,
        authorization,
        attachments,
        cannot_replace: raw.cannot_replace.into(),
        cannot_delete: raw.cannot_delete.into(),
        immutable: raw.immutable.into(),
        document_id_regex_pattern: pattern(raw.document_id_regex_pattern)?,
        allow_unknown_properties: raw.allow_unknown_properties.into(),
        custom_actions: Default::default(),
    })
}

fn build_properties(raw: Map<String, Value>, location: &str) -> Result<PropertyValidators, SchemaError> {
    raw.into_iter()
        .map(|(name, v)| {
            let child = format!("{location}.{name}");
            build_validator(v, &child).map(|validator| (name, validator))
        })
        .collect()
}

/// Fields that only some kinds understand, with whether `ty` is one of them.
fn misplaced_field(raw: &RawValidator, ty: DataType) -> Option<&'static str> {
    use DataType::*;
    let ordinal = ty.is_ordinal();
    let checks = [
        ("minimumValue", raw.minimum_value.is_some(), ordinal),
        ("minimumValueExclusive", raw.minimum_value_exclusive.is_some(), ordinal),
        ("maximumValue", raw.maximum_value.is_some(), ordinal),
        ("maximumValueExclusive", raw.maximum_value_exclusive.is_some(), ordinal),
        ("regexPattern", raw.regex_pattern.is_some(), matches!(ty, String | AttachmentReference)),
        ("minimumLength", raw.minimum_length.is_some(), matches!(ty, String | Array)),
        ("maximumLength", raw.maximum_length.is_some(), matches!(ty, String | Array)),
        ("minimumSize", raw.minimum_size.is_some(), ty == Hashtable),
        ("maximumSize", raw.maximum_size.is_some(), matches!(ty, Hashtable | AttachmentReference)),
        ("predefinedValues", raw.predefined_values.is_some(), ty == Enum),
        ("propertyValidators", raw.property_validators.is_some(), ty == Object),
        ("allowUnknownProperties", raw.allow_unknown_properties.is_some(), ty == Object),
        ("arrayElementsValidator", raw.array_elements_validator.is_some(), ty == Array),
        ("hashtableKeysValidator", raw.hashtable_keys_validator.is_some(), ty == Hashtable),
        ("hashtableValuesValidator", raw.hashtable_values_validator.is_some(), ty == Hashtable),
        ("supportedExtensions", raw.supported_extensions.is_some(), ty == AttachmentReference),
        ("supportedContentTypes", raw.supported_content_types.is_some(), ty == AttachmentReference),
    ];
    checks
        .into_iter()
        .find(|(_, present, applies)| *present && !applies)
        .map(|(name, _, _)| name)
}

fn bound(ty: DataType, value: Option<Value>) -> Result<Option<Resolvable<Value>>, SchemaError> {
    match value {
        Some(v) if !is_valid_bound(ty, &v) => Err(SchemaError::InvalidBound {
            kind: ty.name(),
            bound: v.to_string(),
        }),
        other => Ok(literal(other)),
    }
}

fn boxed(raw: Option<Value>, location: String) -> Result<Option<Box<PropertyValidator>>, SchemaError> {
    raw.map(|v| build_validator(v, &location).map(Box::new)).transpose()
}

fn build_validator(raw: Value, location: &str) -> Result<PropertyValidator, SchemaError> {
    let raw: RawValidator = parse(raw, location)?;

    let type_id_shorthand = raw.type_name == "typeId";
    let ty = if type_id_shorthand {
        DataType::String
    } else {
        DataType::from_name(&raw.type_name).ok_or_else(|| SchemaError::UnknownValidatorType {
            type_name: raw.type_name.clone(),
            location: location.to_string(),
        })?
    };

    if let Some(field) = misplaced_field(&raw, ty) {
        return Err(malformed(location, format!("`{field}` does not apply to type {ty}")));
    }

    let range = || -> Result<RangeBounds, SchemaError> {
        Ok(RangeBounds {
            minimum_value: bound(ty, raw.minimum_value.clone())?,
            minimum_value_exclusive: bound(ty, raw.minimum_value_exclusive.clone())?,
            maximum_value: bound(ty, raw.maximum_value.clone())?,
            maximum_value_exclusive: bound(ty, raw.maximum_value_exclusive.clone())?,
        })
    };
    let length = LengthBounds {
        minimum: literal(raw.minimum_length),
        maximum: literal(raw.maximum_length),
    };

    let kind = match ty {
        DataType::String => ValidatorKind::String(StringConstraints {
            regex_pattern: pattern(raw.regex_pattern.clone())?,
            length,
        }),
        DataType::Date => ValidatorKind::Date(range()?),
        DataType::DateTime => ValidatorKind::DateTime(range()?),
        DataType::TimeZone => ValidatorKind::TimeZone(range()?),
        DataType::Integer => ValidatorKind::Integer(range()?),
        DataType::Float => ValidatorKind::Float(range()?),
        DataType::Boolean => ValidatorKind::Boolean,
        DataType::Any => ValidatorKind::Any,
        DataType::Enum => {
            let values = raw
                .predefined_values
                .clone()
                .ok_or_else(|| malformed(location, "enum validator requires `predefinedValues`"))?;
            ValidatorKind::Enum(EnumConstraints {
                predefined_values: values.into(),
            })
        }
        DataType::Object => ValidatorKind::Object(ObjectConstraints {
            properties: raw
                .property_validators
                .clone()
                .map(|p| build_properties(p, location))
                .transpose()?,
            allow_unknown_properties: raw.allow_unknown_properties.unwrap_or(false).into(),
        }),
        DataType::Array => ValidatorKind::Array(ArrayConstraints {
            length,
            elements: boxed(raw.array_elements_validator.clone(), format!("{location}[]"))?,
        }),
        DataType::Hashtable => ValidatorKind::Hashtable(HashtableConstraints {
            size: LengthBounds {
                minimum: literal(raw.minimum_size),
                maximum: literal(raw.maximum_size),
            },
            keys: raw
                .hashtable_keys_validator
                .as_ref()
                .map(|k| -> Result<KeyValidator, SchemaError> {
                    Ok(KeyValidator {
                        must_not_be_empty: k.must_not_be_empty.into(),
                        regex_pattern: pattern(k.regex_pattern.clone())?,
                    })
                })
                .transpose()?,
            values: boxed(raw.hashtable_values_validator.clone(), format!("{location}[]"))?,
        }),
        DataType::AttachmentReference => ValidatorKind::AttachmentReference(AttachmentReferenceConstraints {
            regex_pattern: pattern(raw.regex_pattern.clone())?,
            supported_extensions: literal(raw.supported_extensions.clone()),
            supported_content_types: literal(raw.supported_content_types.clone()),
            maximum_size: literal(raw.maximum_size),
        }),
    };

    if let Some(expected) = &raw.must_equal {
        if ty.is_ordinal() && !is_valid_bound(ty, expected) {
            return Err(SchemaError::InvalidBound {
                kind: ty.name(),
                bound: expected.to_string(),
            });
        }
    }

    let mut validator = PropertyValidator::new(kind);
    validator.required = (raw.required || type_id_shorthand).into();
    validator.must_not_be_empty = (raw.must_not_be_empty || type_id_shorthand).into();
    validator.immutable = (raw.immutable || type_id_shorthand).into();
    validator.immutable_when_set = raw.immutable_when_set.into();
    validator.must_equal = literal(raw.must_equal);
    Ok(validator)
}
