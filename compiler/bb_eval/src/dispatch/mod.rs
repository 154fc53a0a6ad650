//! Operation dispatch.
//!
//! Every value operation goes through three tiers:
//!
//! 1. **Literals.** Two inline literals are handled by fixed formulas
//!    without allocating.
//! 2. **Receiver.** Otherwise the left operand's [`Data`] implementation is
//!    asked, then (for binary operations) the right operand's, with
//!    [`Side::Right`] so it can pick its mirrored behavior.
//! 3. **Failure.** If nobody implements the operation the result is a
//!    `No valid builtin implementation` error naming the operand types.
//!
//! Error operands short-circuit before tier 2: the left one is checked
//! first, then the right one; the first error found is consumed and
//! propagated.
//!
//! `at`, `put` and `push` are only ever dispatched to their receiver.

mod literal;

use crate::data::{string_value, Data, OpFailure, OpResult, Side};
use crate::errors::no_implementation;
use crate::{Cx, DataPtr, EvalError, EvalResult};
use bb_ir::OpCode;

/// Consume and return the error carried by `value`.
pub(crate) fn propagate_error(value: &DataPtr) -> Result<(), EvalError> {
    match value.error() {
        Some(error) => {
            error.consume();
            Err(error.error().clone())
        }
        None => Ok(()),
    }
}

/// `Some(result)` unless the receiver declined.
fn settled(outcome: OpResult) -> Option<EvalResult> {
    match outcome {
        Ok(value) => Some(Ok(value)),
        Err(OpFailure::Failed(error)) => Some(Err(error)),
        Err(OpFailure::Unimplemented) => None,
    }
}

pub fn binary(cx: &Cx<'_>, op: OpCode, left: &DataPtr, right: &DataPtr) -> EvalResult {
    if let Some(result) = literal::binary(op, left, right) {
        return result;
    }
    propagate_error(left)?;
    propagate_error(right)?;

    if let Some(obj) = left.obj() {
        if let Some(result) = settled(obj.binary(cx, op, left, right, Side::Left)) {
            return result;
        }
    }
    if let Some(obj) = right.obj() {
        if let Some(result) = settled(obj.binary(cx, op, right, left, Side::Right)) {
            return result;
        }
    }
    Err(no_implementation(op.name(), &[left.type_name(), right.type_name()]))
}

pub fn unary(cx: &Cx<'_>, op: OpCode, value: &DataPtr) -> EvalResult {
    if let Some(result) = literal::unary(op, value) {
        return result;
    }
    propagate_error(value)?;

    if let Some(obj) = value.obj() {
        if let Some(result) = settled(obj.unary(cx, op, value)) {
            return result;
        }
        match op {
            OpCode::ToStr => return Ok(string_value(obj.text(cx, value)?)),
            OpCode::ToCopy => return Ok(obj.shallow_copy(value)),
            _ => {}
        }
    }
    Err(no_implementation(op.name(), &[value.type_name()]))
}

pub fn at(cx: &Cx<'_>, object: &DataPtr, index: &DataPtr) -> EvalResult {
    propagate_error(object)?;
    propagate_error(index)?;
    object
        .obj()
        .and_then(|obj| settled(obj.at(cx, object, index)))
        .unwrap_or_else(|| Err(no_implementation("at", &[object.type_name(), index.type_name()])))
}

pub fn put(cx: &Cx<'_>, object: &DataPtr, index: &DataPtr, value: &DataPtr) -> EvalResult {
    propagate_error(object)?;
    propagate_error(index)?;
    propagate_error(value)?;
    object
        .obj()
        .and_then(|obj| settled(obj.put(cx, object, index, value)))
        .unwrap_or_else(|| {
            Err(no_implementation(
                "put",
                &[object.type_name(), index.type_name(), value.type_name()],
            ))
        })
}

pub fn push(cx: &Cx<'_>, object: &DataPtr, value: &DataPtr) -> EvalResult {
    propagate_error(object)?;
    propagate_error(value)?;
    object
        .obj()
        .and_then(|obj| settled(obj.push(cx, object, value)))
        .unwrap_or_else(|| Err(no_implementation("push", &[object.type_name(), value.type_name()])))
}

/// Printable text of any value.
pub fn text(cx: &Cx<'_>, value: &DataPtr) -> Result<String, EvalError> {
    if let Some(text) = value.literal_text() {
        return Ok(text);
    }
    match value.obj() {
        Some(obj) => obj.text(cx, value),
        None => Ok("missing".to_string()),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
