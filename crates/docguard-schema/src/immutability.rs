//! # Immutability and Replace Policy
//!
//! Property level:
//!
//! - `immutable`: whenever a live prior revision exists, the value must
//!   equal its counterpart in that revision.
//! - `immutable_when_set`: as above, but only once the prior value is
//!   present and non-null.
//!
//! `null` and absent are the same for both modes.
//!
//! Document level: a definition may forbid replacement, deletion or both.
//! These violations are reported alongside property violations and are
//! evaluated for deletions too.

use serde_json::Value;

use crate::authorization::Operation;
use crate::definition::DocumentDefinition;
use crate::error::SchemaError;
use crate::resolvable::ResolveContext;
use crate::types::semantically_equal;
use crate::validator::PropertyValidator;
use crate::violation::Violation;

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Whether a property value may change from `old` to `new` under `validator`.
///
/// `item` is the property-level context; `item.value` and `item.old_value`
/// are the pair being compared.
pub fn check_property(
    validator: &PropertyValidator,
    item: &ResolveContext<'_>,
) -> Result<Option<Violation>, SchemaError> {
    if !item.has_old_doc() {
        return Ok(None);
    }

    let new = present(item.value);
    let old = present(item.old_value);

    let guarded = validator.immutable.resolve(item)?
        || (old.is_some() && validator.immutable_when_set.resolve(item)?);
    if !guarded {
        return Ok(None);
    }

    let unchanged = match (new, old) {
        (None, None) => true,
        (Some(a), Some(b)) => semantically_equal(validator.data_type(), a, b),
        _ => false,
    };
    Ok((!unchanged).then_some(Violation::Immutable))
}

/// Whole-document replace/delete policy for `operation`.
///
/// Nothing is reported unless a live prior revision exists.
pub fn check_document(
    definition: &DocumentDefinition,
    operation: Operation,
    ctx: &ResolveContext<'_>,
) -> Result<Option<Violation>, SchemaError> {
    if !ctx.has_old_doc() {
        return Ok(None);
    }

    if definition.immutable.resolve(ctx)? {
        return Ok(Some(Violation::CannotReplaceOrDelete));
    }
    let violation = match operation {
        Operation::Remove if definition.cannot_delete.resolve(ctx)? => Some(Violation::CannotDelete),
        Operation::Replace if definition.cannot_replace.resolve(ctx)? => Some(Violation::CannotReplace),
        _ => None,
    };
    Ok(violation)
}
