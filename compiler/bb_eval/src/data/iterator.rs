use super::{index_of, Data, ErrorData, ListData, OpFailure, OpResult};
use crate::errors::{index_out_of_range, integer_overflow, out_of_range, runtime, type_mismatch};
use crate::{dispatch, Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use parking_lot::Mutex;

/// Half-open integer range `first..last` advancing by `step`.
#[derive(Debug)]
pub struct IntRange {
    state: Mutex<(i64, i64, i64)>,
}

impl IntRange {
    pub fn new(first: i64, last: i64, step: i64) -> Result<Self, EvalError> {
        if step == 0 {
            return Err(runtime("A range iterator with zero step never ends."));
        }
        Ok(IntRange {
            state: Mutex::new((first, last, step)),
        })
    }

    /// Elements left, computed wide so no pair of `i64` bounds overflows.
    fn remaining(first: i64, last: i64, step: i64) -> i128 {
        let (first, last, step) = (i128::from(first), i128::from(last), i128::from(step));
        let span = if step > 0 { last - first } else { first - last };
        if span <= 0 {
            0
        } else {
            (span + step.abs() - 1) / step.abs()
        }
    }

    fn element(first: i64, step: i64, index: i128) -> Result<i64, EvalError> {
        i64::try_from(i128::from(first) + index * i128::from(step))
            .map_err(|_| integer_overflow("range"))
    }
}

impl Data for IntRange {
    fn type_name(&self) -> &'static str {
        "iter"
    }

    fn unary(&self, _cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        match op {
            OpCode::Next => {
                let mut state = self.state.lock();
                let (first, last, step) = *state;
                if Self::remaining(first, last, step) == 0 {
                    return Ok(ErrorData::value(out_of_range()));
                }
                state.0 = first.saturating_add(step);
                Ok(DataPtr::from_int(first))
            }
            OpCode::Len => {
                let (first, last, step) = *self.state.lock();
                let len = i64::try_from(Self::remaining(first, last, step))
                    .map_err(|_| integer_overflow("range length"))?;
                Ok(DataPtr::from_int(len))
            }
            OpCode::ToIter => Ok(this.clone()),
            OpCode::ToList => {
                let (first, last, step) = *self.state.lock();
                let count = Self::remaining(first, last, step);
                let items = (0..count)
                    .map(|i| Self::element(first, step, i).map(DataPtr::from_int))
                    .collect::<Result<Vec<DataPtr>, EvalError>>()?;
                Ok(DataPtr::new(ListData::new(items)))
            }
            _ => Err(OpFailure::Unimplemented),
        }
    }

    fn at(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr) -> OpResult {
        let index = index_of(index)?;
        let (first, last, step) = *self.state.lock();
        let count = Self::remaining(first, last, step);
        if index < 0 || i128::from(index) >= count {
            return Err(index_out_of_range(index, usize::try_from(count).unwrap_or(usize::MAX)).into());
        }
        Ok(DataPtr::from_int(Self::element(first, step, i128::from(index))?))
    }
}

/// Float range `first..last` advancing by `step`.
#[derive(Debug)]
pub struct FloatRange {
    state: Mutex<(f64, f64, f64)>,
}

impl FloatRange {
    pub fn new(first: f64, last: f64, step: f64) -> Result<Self, EvalError> {
        if step == 0.0 {
            return Err(runtime("A range iterator with zero step never ends."));
        }
        Ok(FloatRange {
            state: Mutex::new((first, last, step)),
        })
    }

    fn done(first: f64, last: f64, step: f64) -> bool {
        (step > 0.0 && first >= last) || (step < 0.0 && first <= last)
    }
}

impl Data for FloatRange {
    fn type_name(&self) -> &'static str {
        "iter"
    }

    fn unary(&self, _cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        match op {
            OpCode::Next => {
                let mut state = self.state.lock();
                let (first, last, step) = *state;
                if Self::done(first, last, step) {
                    return Ok(ErrorData::value(out_of_range()));
                }
                state.0 = first + step;
                Ok(DataPtr::from_float(first))
            }
            OpCode::ToIter => Ok(this.clone()),
            _ => Err(OpFailure::Unimplemented),
        }
    }
}

/// Iterates anything that answers `len` and `at`.
#[derive(Debug)]
pub struct AccessIter {
    object: DataPtr,
    position: Mutex<i64>,
}

impl AccessIter {
    pub fn new(object: DataPtr) -> Self {
        AccessIter {
            object,
            position: Mutex::new(0),
        }
    }
}

impl Data for AccessIter {
    fn type_name(&self) -> &'static str {
        "iter"
    }

    fn unary(&self, cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        match op {
            OpCode::Next => {
                let len = dispatch::unary(cx, OpCode::Len, &self.object)?;
                let len = len
                    .as_int()
                    .ok_or_else(|| type_mismatch("int length", len.type_name()))?;
                let position = {
                    let mut position = self.position.lock();
                    if *position >= len {
                        return Ok(ErrorData::value(out_of_range()));
                    }
                    *position += 1;
                    *position - 1
                };
                Ok(dispatch::at(cx, &self.object, &DataPtr::from_int(position))?)
            }
            OpCode::Len => {
                let len = dispatch::unary(cx, OpCode::Len, &self.object)?;
                let position = *self.position.lock();
                Ok(DataPtr::from_int(len.as_int().unwrap_or(0).saturating_sub(position).max(0)))
            }
            OpCode::ToIter => Ok(this.clone()),
            _ => Err(OpFailure::Unimplemented),
        }
    }
}
