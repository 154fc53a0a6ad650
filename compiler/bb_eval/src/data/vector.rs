use super::{checked_index, index_of, AccessIter, Data, ListData, OpFailure, OpResult, Side};
use crate::errors::runtime;
use crate::{Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use parking_lot::RwLock;

/// Dense vector of floats with elementwise arithmetic.
#[derive(Debug, Default)]
pub struct VectorData {
    values: RwLock<Vec<f64>>,
}

impl VectorData {
    pub fn new(values: Vec<f64>) -> Self {
        VectorData {
            values: RwLock::new(values),
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

fn apply(op: OpCode, a: f64, b: f64) -> Option<f64> {
    Some(match op {
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => a / b,
        OpCode::Pow => a.powf(b),
        _ => return None,
    })
}

impl Data for VectorData {
    fn type_name(&self) -> &'static str {
        "vector"
    }

    fn text(&self, _cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        let parts: Vec<String> = self.values.read().iter().map(f64::to_string).collect();
        Ok(format!("[{}]", parts.join(", ")))
    }

    fn binary(&self, _cx: &Cx<'_>, op: OpCode, _this: &DataPtr, other: &DataPtr, side: Side) -> OpResult {
        let mine = self.to_vec();

        if let Some(other) = other.downcast::<VectorData>() {
            let theirs = other.to_vec();
            if mine.len() != theirs.len() {
                return Err(runtime(format!(
                    "Vectors of different sizes: {} vs {}",
                    mine.len(),
                    theirs.len()
                ))
                .into());
            }
            if op == OpCode::MMul {
                let dot: f64 = mine.iter().zip(&theirs).map(|(a, b)| a * b).sum();
                return Ok(DataPtr::from_float(dot));
            }
            let (left, right) = match side {
                Side::Left => (&mine, &theirs),
                Side::Right => (&theirs, &mine),
            };
            let values = left
                .iter()
                .zip(right)
                .map(|(a, b)| apply(op, *a, *b).ok_or(OpFailure::Unimplemented))
                .collect::<Result<Vec<f64>, OpFailure>>()?;
            return Ok(DataPtr::new(VectorData::new(values)));
        }

        let scalar = other.as_number().ok_or(OpFailure::Unimplemented)?;
        let values = mine
            .iter()
            .map(|v| {
                let (a, b) = match side {
                    Side::Left => (*v, scalar),
                    Side::Right => (scalar, *v),
                };
                apply(op, a, b).ok_or(OpFailure::Unimplemented)
            })
            .collect::<Result<Vec<f64>, OpFailure>>()?;
        Ok(DataPtr::new(VectorData::new(values)))
    }

    fn unary(&self, _cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        let values = self.values.read();
        match op {
            OpCode::Len => Ok(DataPtr::from_int(i64::try_from(values.len()).unwrap_or(i64::MAX))),
            OpCode::Sum => Ok(DataPtr::from_float(values.iter().sum())),
            OpCode::Max | OpCode::Min => {
                let pick: fn(f64, f64) -> f64 = if op == OpCode::Max { f64::max } else { f64::min };
                values
                    .iter()
                    .copied()
                    .reduce(pick)
                    .map(DataPtr::from_float)
                    .ok_or_else(|| runtime(format!("Cannot compute {} of an empty vector", op.name())).into())
            }
            OpCode::Log => Ok(DataPtr::new(VectorData::new(values.iter().map(|v| v.ln()).collect()))),
            OpCode::ToCopy => Ok(DataPtr::new(VectorData::new(values.clone()))),
            OpCode::ToVector => Ok(this.clone()),
            OpCode::ToList => Ok(DataPtr::new(ListData::new(
                values.iter().map(|v| DataPtr::from_float(*v)),
            ))),
            OpCode::ToIter => Ok(DataPtr::new(AccessIter::new(this.clone()))),
            _ => Err(OpFailure::Unimplemented),
        }
    }

    fn at(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr) -> OpResult {
        let index = index_of(index)?;
        let values = self.values.read();
        let position = checked_index(index, values.len())?;
        Ok(DataPtr::from_float(values[position]))
    }

    fn put(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr, value: &DataPtr) -> OpResult {
        let index = index_of(index)?;
        let value = value
            .as_number()
            .ok_or_else(|| runtime("Can only put numbers in a vector"))?;
        let mut values = self.values.write();
        let position = checked_index(index, values.len())?;
        values[position] = value;
        Ok(DataPtr::missing())
    }
}
