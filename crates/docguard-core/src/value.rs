//! # JSON Value Helpers
//!
//! Small, pure helpers over `serde_json::Value` shared by the validator:
//! kind names, numeric comparison that does not lose integer precision,
//! numeric-aware deep equality, and the plain rendering used when a bound
//! is quoted in a violation message.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Human-readable name of a JSON value's kind.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a number is mathematically integral.
///
/// Integers stored as `i64`/`u64` are integral by construction; floats are
/// integral when finite with no fractional part, so `3.0` counts.
pub fn is_integral(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    number
        .as_f64()
        .is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

/// Compare two numbers by value.
///
/// Integers compare exactly against integers and against floats; only two
/// floats compare as `f64`. Returns `None` only for NaN, which JSON cannot
/// carry.
pub fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (as_i128(a), as_i128(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        (Some(x), None) => compare_integer_to_float(x, b.as_f64()?),
        (None, Some(y)) => compare_integer_to_float(y, a.as_f64()?).map(Ordering::reverse),
        (None, None) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn as_i128(number: &Number) -> Option<i128> {
    number
        .as_i64()
        .map(i128::from)
        .or_else(|| number.as_u64().map(i128::from))
}

/// 2^127, the first magnitude outside `i128`.
const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

fn compare_integer_to_float(int: i128, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= I128_LIMIT {
        return Some(Ordering::Less);
    }
    if float < -I128_LIMIT {
        return Some(Ordering::Greater);
    }
    // In range and integral, so the cast is exact.
    let whole = float.trunc();
    match int.cmp(&(whole as i128)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        unequal => Some(unequal),
    }
}

/// Deep equality that treats `1` and `1.0` as the same number.
///
/// Object comparison ignores property order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Render a value the way it is quoted in violation messages: strings bare,
/// everything else as compact JSON.
pub fn display_plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
