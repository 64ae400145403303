//! # Type Validators
//!
//! Kind checks and the scalar constraints that apply to a single present
//! value: range bounds, semantic equality and emptiness. Recursion into
//! objects, arrays and hashtables is the walker's job.
//!
//! Temporal values compare by what they mean. Two date/time strings that
//! name the same instant are equal, and `Z`, `+00:00` and `-00:00` are the
//! same time zone.

use std::cmp::Ordering;

use docguard_core::value::{compare_numbers, is_integral, values_equal};
use docguard_core::{IsoDate, IsoDateTime, IsoTimeZone};
use serde_json::{Number, Value};

use crate::error::SchemaError;
use crate::resolvable::ResolveContext;
use crate::validator::{BoundOp, DataType, RangeBounds};
use crate::violation::Violation;

/// Whether `value` (present and non-null) is of kind `ty`.
pub fn matches_type(ty: DataType, value: &Value) -> bool {
    match ty {
        DataType::String | DataType::AttachmentReference => value.is_string(),
        DataType::Date => value.as_str().is_some_and(|s| IsoDate::parse(s).is_ok()),
        DataType::DateTime => value.as_str().is_some_and(|s| IsoDateTime::parse(s).is_ok()),
        DataType::TimeZone => value.as_str().is_some_and(|s| IsoTimeZone::parse(s).is_ok()),
        DataType::Integer => matches!(value, Value::Number(n) if is_integral(n)),
        DataType::Float => value.is_number(),
        DataType::Boolean => value.is_boolean(),
        DataType::Enum => value.is_string() || matches!(value, Value::Number(n) if is_integral(n)),
        DataType::Object | DataType::Hashtable => value.is_object(),
        DataType::Array => value.is_array(),
        DataType::Any => true,
    }
}

/// Whether the value is an empty string, array or object.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// A value reduced to something that orders by meaning.
#[derive(Debug, Clone, PartialEq)]
enum Magnitude {
    Number(Number),
    Instant(i64),
    Offset(i32),
}

impl Magnitude {
    fn of(ty: DataType, value: &Value) -> Option<Self> {
        match ty {
            DataType::Integer | DataType::Float => match value {
                Value::Number(n) => Some(Self::Number(n.clone())),
                _ => None,
            },
            DataType::Date => IsoDate::parse(value.as_str()?)
                .ok()
                .map(|d| Self::Instant(d.instant_millis())),
            DataType::DateTime => {
                let text = value.as_str()?;
                match IsoDateTime::parse(text) {
                    Ok(dt) => Some(Self::Instant(dt.instant_millis())),
                    Err(_) => IsoDate::parse(text).ok().map(|d| Self::Instant(d.instant_millis())),
                }
            }
            DataType::TimeZone => IsoTimeZone::parse(value.as_str()?)
                .ok()
                .map(|tz| Self::Offset(tz.offset_minutes())),
            _ => None,
        }
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => compare_numbers(a, b),
            (Self::Instant(a), Self::Instant(b)) => Some(a.cmp(b)),
            (Self::Offset(a), Self::Offset(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Whether `bound` can be compared against values of kind `ty`.
pub fn is_valid_bound(ty: DataType, bound: &Value) -> bool {
    bound.is_null() || Magnitude::of(ty, bound).is_some()
}

/// Check `value` against every configured bound, in min, exclusive min,
/// max, exclusive max order.
///
/// `value` must already have passed [`matches_type`].
pub fn check_range(
    ty: DataType,
    range: &RangeBounds,
    value: &Value,
    ctx: &ResolveContext<'_>,
) -> Result<Vec<Violation>, SchemaError> {
    let mut violations = Vec::new();
    let Some(actual) = Magnitude::of(ty, value) else {
        return Ok(violations);
    };

    for (op, slot) in range.configured() {
        let bound = slot.resolve(ctx)?;
        if bound.is_null() {
            continue;
        }
        let limit = Magnitude::of(ty, &bound).ok_or_else(|| SchemaError::InvalidBound {
            kind: ty.name(),
            bound: bound.to_string(),
        })?;
        let Some(ordering) = actual.compare(&limit) else {
            continue;
        };
        let violation = match op {
            BoundOp::Min if ordering == Ordering::Less => Violation::BelowMinimum(bound),
            BoundOp::MinExclusive if ordering != Ordering::Greater => {
                Violation::NotAboveExclusiveMinimum(bound)
            }
            BoundOp::Max if ordering == Ordering::Greater => Violation::AboveMaximum(bound),
            BoundOp::MaxExclusive if ordering != Ordering::Less => {
                Violation::NotBelowExclusiveMaximum(bound)
            }
            _ => continue,
        };
        violations.push(violation);
    }
    Ok(violations)
}

/// Equality as the kind understands it.
///
/// Temporal kinds compare parsed values when both sides parse; everything
/// else uses numeric-aware deep equality. `null` never equals a present
/// value here, so callers handle absence before asking.
pub fn semantically_equal(ty: DataType, a: &Value, b: &Value) -> bool {
    if matches!(ty, DataType::Date | DataType::DateTime | DataType::TimeZone) {
        if let (Some(x), Some(y)) = (Magnitude::of(ty, a), Magnitude::of(ty, b)) {
            return x == y;
        }
    }
    values_equal(a, b)
}
