//! # Property Validator Model
//!
//! A [`PropertyValidator`] is one node of a definition's validator tree. The
//! fields every kind shares live on the node; the fields only one kind
//! understands live on its [`ValidatorKind`] variant, so the walker can
//! dispatch by exhaustive match and a range bound can never be attached to
//! a boolean.
//!
//! Every constraint is a [`Resolvable`] and may depend on the write.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::{ResolveError, SchemaError};
use crate::resolvable::{ResolveContext, Resolvable};

/// The data kinds a validator can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Date,
    DateTime,
    TimeZone,
    Integer,
    Float,
    Boolean,
    Enum,
    Object,
    Array,
    Hashtable,
    AttachmentReference,
    Any,
}

impl DataType {
    /// Name used in definition files.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::TimeZone => "timezone",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::Array => "array",
            Self::Hashtable => "hashtable",
            Self::AttachmentReference => "attachmentReference",
            Self::Any => "any",
        }
    }

    /// Look up a kind by its definition-file name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "timezone" => Self::TimeZone,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "enum" => Self::Enum,
            "object" => Self::Object,
            "array" => Self::Array,
            "hashtable" => Self::Hashtable,
            "attachmentReference" => Self::AttachmentReference,
            "any" => Self::Any,
            _ => return None,
        })
    }

    /// Violation text for a value of the wrong kind.
    pub fn type_violation(self) -> &'static str {
        match self {
            Self::String => "must be a string",
            Self::Date => "must be an ISO 8601 date string",
            Self::DateTime => "must be an ISO 8601 date/time string",
            Self::TimeZone => "must be an ISO 8601 time zone string",
            Self::Integer => "must be an integer",
            Self::Float => "must be a floating point or integer number",
            Self::Boolean => "must be a boolean",
            Self::Enum => "must be a string or integer",
            Self::Object => "must be an object",
            Self::Array => "must be an array",
            Self::Hashtable => "must be an object/hashtable",
            Self::AttachmentReference => "must be an attachment reference string",
            Self::Any => "may be any value",
        }
    }

    /// Whether range constraints apply to this kind.
    pub fn is_ordinal(self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Float | Self::Date | Self::DateTime | Self::TimeZone
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A compiled regular expression that must match a whole value.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source`. The expression is anchored at both ends.
    pub fn new(source: impl Into<String>) -> Result<Self, SchemaError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| SchemaError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { source, regex })
    }

    /// The expression as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether `text` matches in full.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Minimum/maximum bounds, each inclusive or exclusive.
///
/// Bounds are JSON values: numbers for numeric kinds, ISO 8601 strings for
/// the temporal kinds. A bound that resolves to `null` is ignored.
#[derive(Debug, Clone, Default)]
pub struct RangeBounds {
    pub minimum_value: Option<Resolvable<Value>>,
    pub minimum_value_exclusive: Option<Resolvable<Value>>,
    pub maximum_value: Option<Resolvable<Value>>,
    pub maximum_value_exclusive: Option<Resolvable<Value>>,
}

impl RangeBounds {
    pub fn minimum(mut self, bound: impl Into<Value>) -> Self {
        self.minimum_value = Some(Resolvable::Literal(bound.into()));
        self
    }

    pub fn minimum_exclusive(mut self, bound: impl Into<Value>) -> Self {
        self.minimum_value_exclusive = Some(Resolvable::Literal(bound.into()));
        self
    }

    pub fn maximum(mut self, bound: impl Into<Value>) -> Self {
        self.maximum_value = Some(Resolvable::Literal(bound.into()));
        self
    }

    pub fn maximum_exclusive(mut self, bound: impl Into<Value>) -> Self {
        self.maximum_value_exclusive = Some(Resolvable::Literal(bound.into()));
        self
    }

    /// Every configured bound paired with its operator.
    pub(crate) fn configured(&self) -> impl Iterator<Item = (BoundOp, &Resolvable<Value>)> {
        [
            (BoundOp::Min, &self.minimum_value),
            (BoundOp::MinExclusive, &self.minimum_value_exclusive),
            (BoundOp::Max, &self.maximum_value),
            (BoundOp::MaxExclusive, &self.maximum_value_exclusive),
        ]
        .into_iter()
        .filter_map(|(op, slot)| slot.as_ref().map(|s| (op, s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoundOp {
    Min,
    MinExclusive,
    Max,
    MaxExclusive,
}

/// Lower and upper limits on a length or entry count.
#[derive(Debug, Clone, Default)]
pub struct LengthBounds {
    pub minimum: Option<Resolvable<u64>>,
    pub maximum: Option<Resolvable<u64>>,
}

impl LengthBounds {
    pub fn between(minimum: u64, maximum: u64) -> Self {
        Self {
            minimum: Some(minimum.into()),
            maximum: Some(maximum.into()),
        }
    }

    pub fn at_least(minimum: u64) -> Self {
        Self {
            minimum: Some(minimum.into()),
            maximum: None,
        }
    }

    pub fn at_most(maximum: u64) -> Self {
        Self {
            minimum: None,
            maximum: Some(maximum.into()),
        }
    }
}

/// Constraints on the keys of a hashtable.
#[derive(Debug, Clone, Default)]
pub struct KeyValidator {
    pub must_not_be_empty: Resolvable<bool>,
    pub regex_pattern: Option<Resolvable<Pattern>>,
}

/// Kind-specific constraints for string values.
#[derive(Debug, Clone, Default)]
pub struct StringConstraints {
    pub regex_pattern: Option<Resolvable<Pattern>>,
    pub length: LengthBounds,
}

/// Kind-specific constraints for enum values.
#[derive(Debug, Clone, Default)]
pub struct EnumConstraints {
    pub predefined_values: Resolvable<Vec<Value>>,
}

/// Kind-specific constraints for nested objects.
#[derive(Debug, Clone, Default)]
pub struct ObjectConstraints {
    /// Declared children. `None` accepts any object without recursing.
    pub properties: Option<PropertyValidators>,
    pub allow_unknown_properties: Resolvable<bool>,
}

/// Kind-specific constraints for arrays.
#[derive(Debug, Clone, Default)]
pub struct ArrayConstraints {
    pub length: LengthBounds,
    pub elements: Option<Box<PropertyValidator>>,
}

/// Kind-specific constraints for hashtables.
#[derive(Debug, Clone, Default)]
pub struct HashtableConstraints {
    pub size: LengthBounds,
    pub keys: Option<KeyValidator>,
    pub values: Option<Box<PropertyValidator>>,
}

/// Kind-specific constraints for attachment references.
#[derive(Debug, Clone, Default)]
pub struct AttachmentReferenceConstraints {
    pub regex_pattern: Option<Resolvable<Pattern>>,
    pub supported_extensions: Option<Resolvable<Vec<String>>>,
    pub supported_content_types: Option<Resolvable<Vec<String>>>,
    pub maximum_size: Option<Resolvable<u64>>,
}

/// The kind a validator requires, with that kind's constraints.
#[derive(Debug, Clone)]
pub enum ValidatorKind {
    String(StringConstraints),
    Date(RangeBounds),
    DateTime(RangeBounds),
    TimeZone(RangeBounds),
    Integer(RangeBounds),
    Float(RangeBounds),
    Boolean,
    Enum(EnumConstraints),
    Object(ObjectConstraints),
    Array(ArrayConstraints),
    Hashtable(HashtableConstraints),
    AttachmentReference(AttachmentReferenceConstraints),
    Any,
}

impl ValidatorKind {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Date(_) => DataType::Date,
            Self::DateTime(_) => DataType::DateTime,
            Self::TimeZone(_) => DataType::TimeZone,
            Self::Integer(_) => DataType::Integer,
            Self::Float(_) => DataType::Float,
            Self::Boolean => DataType::Boolean,
            Self::Enum(_) => DataType::Enum,
            Self::Object(_) => DataType::Object,
            Self::Array(_) => DataType::Array,
            Self::Hashtable(_) => DataType::Hashtable,
            Self::AttachmentReference(_) => DataType::AttachmentReference,
            Self::Any => DataType::Any,
        }
    }
}

/// Signature of a custom validation: returns extra violation messages.
pub type CustomValidationFn =
    dyn Fn(&ResolveContext<'_>) -> Result<Vec<String>, ResolveError> + Send + Sync;

/// A custom validation attached to a property.
#[derive(Clone)]
pub struct CustomValidation(Arc<CustomValidationFn>);

impl CustomValidation {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Result<Vec<String>, ResolveError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn run(&self, ctx: &ResolveContext<'_>) -> Result<Vec<String>, ResolveError> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for CustomValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomValidation(..)")
    }
}

/// One node of a validator tree.
#[derive(Debug, Clone)]
pub struct PropertyValidator {
    pub kind: ValidatorKind,
    pub required: Resolvable<bool>,
    pub must_not_be_empty: Resolvable<bool>,
    pub immutable: Resolvable<bool>,
    pub immutable_when_set: Resolvable<bool>,
    /// Expected value; resolving to `null` disables the check.
    pub must_equal: Option<Resolvable<Value>>,
    pub custom_validation: Option<CustomValidation>,
}

impl PropertyValidator {
    pub fn new(kind: ValidatorKind) -> Self {
        Self {
            kind,
            required: false.into(),
            must_not_be_empty: false.into(),
            immutable: false.into(),
            immutable_when_set: false.into(),
            must_equal: None,
            custom_validation: None,
        }
    }

    pub fn string() -> Self {
        Self::new(ValidatorKind::String(StringConstraints::default()))
    }

    pub fn string_matching(pattern: Pattern) -> Self {
        Self::new(ValidatorKind::String(StringConstraints {
            regex_pattern: Some(pattern.into()),
            length: LengthBounds::default(),
        }))
    }

    pub fn date(range: RangeBounds) -> Self {
        Self::new(ValidatorKind::Date(range))
    }

    pub fn datetime(range: RangeBounds) -> Self {
        Self::new(ValidatorKind::DateTime(range))
    }

    pub fn timezone(range: RangeBounds) -> Self {
        Self::new(ValidatorKind::TimeZone(range))
    }

    pub fn integer(range: RangeBounds) -> Self {
        Self::new(ValidatorKind::Integer(range))
    }

    pub fn float(range: RangeBounds) -> Self {
        Self::new(ValidatorKind::Float(range))
    }

    pub fn boolean() -> Self {
        Self::new(ValidatorKind::Boolean)
    }

    pub fn enumeration<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(ValidatorKind::Enum(EnumConstraints {
            predefined_values: values.into_iter().map(Into::into).collect::<Vec<_>>().into(),
        }))
    }

    pub fn object(properties: PropertyValidators) -> Self {
        Self::new(ValidatorKind::Object(ObjectConstraints {
            properties: Some(properties),
            allow_unknown_properties: false.into(),
        }))
    }

    pub fn array_of(elements: PropertyValidator) -> Self {
        Self::new(ValidatorKind::Array(ArrayConstraints {
            length: LengthBounds::default(),
            elements: Some(Box::new(elements)),
        }))
    }

    pub fn hashtable(constraints: HashtableConstraints) -> Self {
        Self::new(ValidatorKind::Hashtable(constraints))
    }

    pub fn attachment_reference(constraints: AttachmentReferenceConstraints) -> Self {
        Self::new(ValidatorKind::AttachmentReference(constraints))
    }

    pub fn any() -> Self {
        Self::new(ValidatorKind::Any)
    }

    /// The validator conventionally placed on a `type` property: a
    /// required, non-empty string that can never change.
    pub fn type_id() -> Self {
        Self::string().required().must_not_be_empty().immutable()
    }

    pub fn required(mut self) -> Self {
        self.required = true.into();
        self
    }

    pub fn required_when(mut self, required: Resolvable<bool>) -> Self {
        self.required = required;
        self
    }

    pub fn must_not_be_empty(mut self) -> Self {
        self.must_not_be_empty = true.into();
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true.into();
        self
    }

    pub fn immutable_when(mut self, immutable: Resolvable<bool>) -> Self {
        self.immutable = immutable;
        self
    }

    pub fn immutable_when_set(mut self) -> Self {
        self.immutable_when_set = true.into();
        self
    }

    pub fn immutable_when_set_when(mut self, immutable_when_set: Resolvable<bool>) -> Self {
        self.immutable_when_set = immutable_when_set;
        self
    }

    pub fn must_equal(mut self, expected: impl Into<Value>) -> Self {
        self.must_equal = Some(Resolvable::Literal(expected.into()));
        self
    }

    pub fn with_custom_validation(mut self, validation: CustomValidation) -> Self {
        self.custom_validation = Some(validation);
        self
    }

    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }
}

/// Declared properties of an object, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct PropertyValidators {
    entries: Vec<(String, PropertyValidator)>,
}

impl PropertyValidators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property. Redeclaring a name replaces its validator in place.
    pub fn property(mut self, name: impl Into<String>, validator: PropertyValidator) -> Self {
        self.insert(name, validator);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, validator: PropertyValidator) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = validator,
            None => self.entries.push((name, validator)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValidator> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValidator)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, PropertyValidator)> for PropertyValidators {
    fn from_iter<I: IntoIterator<Item = (S, PropertyValidator)>>(iter: I) -> Self {
        let mut validators = Self::new();
        for (name, validator) in iter {
            validators.insert(name, validator);
        }
        validators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names_round_trip() {
        for ty in [
            DataType::String,
            DataType::Date,
            DataType::DateTime,
            DataType::TimeZone,
            DataType::Integer,
            DataType::Float,
            DataType::Boolean,
            DataType::Enum,
            DataType::Object,
            DataType::Array,
            DataType::Hashtable,
            DataType::AttachmentReference,
            DataType::Any,
        ] {
            assert_eq!(DataType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(DataType::from_name("map"), None);
    }

    #[test]
    fn pattern_matches_whole_value() {
        let p = Pattern::new(r"[a-z]+\.[a-z]+").unwrap();
        assert!(p.is_match("logo.png"));
        assert!(!p.is_match("logo.png!"));
        assert_eq!(p.to_string(), r"/[a-z]+\.[a-z]+/");
    }

    #[test]
    fn invalid_pattern_is_a_schema_error() {
        let err = Pattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn redeclaring_a_property_keeps_its_position() {
        let props = PropertyValidators::new()
            .property("a", PropertyValidator::string())
            .property("b", PropertyValidator::integer(RangeBounds::default()))
            .property("a", PropertyValidator::boolean());
        let names: Vec<_> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(props.get("a").unwrap().data_type(), DataType::Boolean);
    }

    #[test]
    fn type_id_validator() {
        let v = PropertyValidator::type_id();
        assert_eq!(v.data_type(), DataType::String);
        assert_eq!(v.required.as_literal(), Some(&true));
        assert_eq!(v.must_not_be_empty.as_literal(), Some(&true));
        assert_eq!(v.immutable.as_literal(), Some(&true));
    }

    #[test]
    fn range_bounds_in_operator_order() {
        let r = RangeBounds::default().maximum_exclusive(53).minimum_exclusive(51);
        let ops: Vec<_> = r.configured().map(|(op, _)| op).collect();
        assert_eq!(ops, [BoundOp::MinExclusive, BoundOp::MaxExclusive]);
    }
}
