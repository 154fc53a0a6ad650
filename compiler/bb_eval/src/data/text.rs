use super::{checked_index, index_of, AccessIter, Data, OpFailure, OpResult, Side};
use crate::errors::{runtime, type_mismatch};
use crate::{Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use std::sync::Arc;

/// Immutable string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringData {
    value: Arc<str>,
}

impl StringData {
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        StringData {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Wrap `s` as a string value.
pub fn string_value(s: impl Into<Arc<str>>) -> DataPtr {
    DataPtr::new(StringData::new(s))
}

/// Text of a string or literal operand; other heap values do not
/// participate in string operations.
fn plain_text(value: &DataPtr) -> Option<String> {
    if let Some(s) = value.downcast::<StringData>() {
        return Some(s.value.to_string());
    }
    value.literal_text()
}

impl Data for StringData {
    fn type_name(&self) -> &'static str {
        "str"
    }

    fn text(&self, _cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        Ok(self.value.to_string())
    }

    fn binary(&self, _cx: &Cx<'_>, op: OpCode, _this: &DataPtr, other: &DataPtr, side: Side) -> OpResult {
        if op == OpCode::Add {
            let other = plain_text(other).ok_or(OpFailure::Unimplemented)?;
            let joined = match side {
                Side::Left => format!("{}{other}", self.value),
                Side::Right => format!("{other}{}", self.value),
            };
            return Ok(string_value(joined));
        }

        let Some(other) = other.downcast::<StringData>() else {
            return match op {
                OpCode::Eq => Ok(DataPtr::from_bool(false)),
                OpCode::Neq => Ok(DataPtr::from_bool(true)),
                _ => Err(OpFailure::Unimplemented),
            };
        };
        let (left, right) = match side {
            Side::Left => (&*self.value, &*other.value),
            Side::Right => (&*other.value, &*self.value),
        };
        let result = match op {
            OpCode::Eq => left == right,
            OpCode::Neq => left != right,
            OpCode::Lt => left < right,
            OpCode::Le => left <= right,
            OpCode::Gt => left > right,
            OpCode::Ge => left >= right,
            _ => return Err(OpFailure::Unimplemented),
        };
        Ok(DataPtr::from_bool(result))
    }

    fn unary(&self, _cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        let text = self.value.trim();
        match op {
            OpCode::Len => Ok(DataPtr::from_int(i64::try_from(self.len()).unwrap_or(i64::MAX))),
            OpCode::ToStr | OpCode::ToCopy => Ok(this.clone()),
            OpCode::ToInt => text
                .parse::<i64>()
                .map(DataPtr::from_int)
                .map_err(|_| type_mismatch("int", &format!("\"{}\"", self.value)).into()),
            OpCode::ToFloat => text
                .parse::<f64>()
                .map(DataPtr::from_float)
                .map_err(|_| type_mismatch("float", &format!("\"{}\"", self.value)).into()),
            OpCode::ToBool => match text {
                "true" => Ok(DataPtr::from_bool(true)),
                "false" => Ok(DataPtr::from_bool(false)),
                _ => Err(runtime(format!("Cannot convert \"{}\" to bool", self.value)).into()),
            },
            OpCode::ToIter => Ok(DataPtr::new(AccessIter::new(this.clone()))),
            _ => Err(OpFailure::Unimplemented),
        }
    }

    fn at(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr) -> OpResult {
        let index = index_of(index)?;
        let position = checked_index(index, self.len())?;
        let c = self.value.chars().nth(position).unwrap_or_default();
        Ok(string_value(c.to_string()))
    }
}
