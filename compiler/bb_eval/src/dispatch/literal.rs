//! Arithmetic and logic on inline literals.
//!
//! These never allocate (except `str`) and never run user code, which is
//! why the dispatcher tries them before anything else.

use crate::data::string_value;
use crate::errors::{integer_overflow, modulo_by_zero};
use crate::{DataPtr, EvalResult};
use bb_ir::OpCode;

/// Result for two literal operands, or `None` when literals do not cover
/// `op` for these types.
pub(crate) fn binary(op: OpCode, left: &DataPtr, right: &DataPtr) -> Option<EvalResult> {
    if let (Some(a), Some(b)) = (left.as_int(), right.as_int()) {
        return int_binary(op, a, b);
    }
    if let (Some(a), Some(b)) = (left.as_bool(), right.as_bool()) {
        return bool_binary(op, a, b);
    }
    let (a, b) = (left.as_number()?, right.as_number()?);
    float_binary(op, a, b)
}

fn int_binary(op: OpCode, a: i64, b: i64) -> Option<EvalResult> {
    let result = match op {
        OpCode::Add => checked(a.checked_add(b), "addition"),
        OpCode::Sub => checked(a.checked_sub(b), "subtraction"),
        OpCode::Mul => checked(a.checked_mul(b), "multiplication"),
        OpCode::Div => Ok(DataPtr::from_float(a as f64 / b as f64)),
        OpCode::Mod if b == 0 => Err(modulo_by_zero()),
        OpCode::Mod => checked(a.checked_rem(b), "modulo"),
        OpCode::Pow => match u32::try_from(b) {
            Ok(exponent) => checked(a.checked_pow(exponent), "exponentiation"),
            Err(_) if b < 0 => Ok(DataPtr::from_float((a as f64).powf(b as f64))),
            Err(_) => Err(integer_overflow("exponentiation")),
        },
        OpCode::Lt => Ok(DataPtr::from_bool(a < b)),
        OpCode::Le => Ok(DataPtr::from_bool(a <= b)),
        OpCode::Gt => Ok(DataPtr::from_bool(a > b)),
        OpCode::Ge => Ok(DataPtr::from_bool(a >= b)),
        OpCode::Eq => Ok(DataPtr::from_bool(a == b)),
        OpCode::Neq => Ok(DataPtr::from_bool(a != b)),
        _ => return None,
    };
    Some(result)
}

fn checked(value: Option<i64>, operation: &'static str) -> EvalResult {
    value
        .map(DataPtr::from_int)
        .ok_or_else(|| integer_overflow(operation))
}

#[expect(clippy::float_cmp, reason = "Language equality on floats is exact")]
fn float_binary(op: OpCode, a: f64, b: f64) -> Option<EvalResult> {
    let value = match op {
        OpCode::Add => DataPtr::from_float(a + b),
        OpCode::Sub => DataPtr::from_float(a - b),
        OpCode::Mul => DataPtr::from_float(a * b),
        OpCode::Div => DataPtr::from_float(a / b),
        OpCode::Mod => DataPtr::from_float(a % b),
        OpCode::Pow => DataPtr::from_float(a.powf(b)),
        OpCode::Lt => DataPtr::from_bool(a < b),
        OpCode::Le => DataPtr::from_bool(a <= b),
        OpCode::Gt => DataPtr::from_bool(a > b),
        OpCode::Ge => DataPtr::from_bool(a >= b),
        OpCode::Eq => DataPtr::from_bool(a == b),
        OpCode::Neq => DataPtr::from_bool(a != b),
        _ => return None,
    };
    Some(Ok(value))
}

fn bool_binary(op: OpCode, a: bool, b: bool) -> Option<EvalResult> {
    let value = match op {
        OpCode::And => a && b,
        OpCode::Or => a || b,
        OpCode::Eq => a == b,
        OpCode::Neq => a != b,
        _ => return None,
    };
    Some(Ok(DataPtr::from_bool(value)))
}

/// Result for one literal operand, or `None` when literals do not cover
/// `op` for this type.
pub(crate) fn unary(op: OpCode, value: &DataPtr) -> Option<EvalResult> {
    if !value.is_literal() {
        return None;
    }
    let result = match op {
        OpCode::Not => DataPtr::from_bool(!value.as_bool()?),
        OpCode::ToCopy => value.clone(),
        OpCode::ToStr => string_value(value.literal_text()?),
        OpCode::ToInt => match (value.as_int(), value.as_float(), value.as_bool()) {
            (Some(v), _, _) => DataPtr::from_int(v),
            (_, Some(v), _) => DataPtr::from_int(v as i64),
            (_, _, Some(v)) => DataPtr::from_int(i64::from(v)),
            _ => return None,
        },
        OpCode::ToFloat => match value.as_bool() {
            Some(v) => DataPtr::from_float(if v { 1.0 } else { 0.0 }),
            None => DataPtr::from_float(value.as_number()?),
        },
        OpCode::ToBool => match value.as_bool() {
            Some(v) => DataPtr::from_bool(v),
            None => DataPtr::from_bool(value.as_number()? != 0.0),
        },
        OpCode::Log => DataPtr::from_float(value.as_number()?.ln()),
        _ => return None,
    };
    Some(Ok(result))
}
