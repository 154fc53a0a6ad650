use super::{checked_index, index_of, AccessIter, Data, ErrorData, MapData, OpFailure, OpResult, VectorData};
use crate::errors::{index_out_of_range, out_of_range, runtime};
use crate::{dispatch, Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Growable, mutable sequence.
///
/// The lock is never held while user code runs: operations that need
/// element text or comparisons work on a snapshot.
#[derive(Debug, Default)]
pub struct ListData {
    items: Mutex<VecDeque<DataPtr>>,
}

impl ListData {
    pub fn new(items: impl IntoIterator<Item = DataPtr>) -> Self {
        ListData {
            items: Mutex::new(items.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<DataPtr> {
        self.items.lock().iter().cloned().collect()
    }

    pub fn push_back(&self, value: DataPtr) {
        self.items.lock().push_back(value);
    }

    pub fn pop_front(&self) -> Option<DataPtr> {
        self.items.lock().pop_front()
    }

    pub fn get(&self, index: usize) -> Option<DataPtr> {
        self.items.lock().get(index).cloned()
    }

    fn to_map(&self) -> Result<DataPtr, EvalError> {
        let map = MapData::default();
        for entry in self.snapshot() {
            let pair = entry
                .downcast::<ListData>()
                .map(ListData::snapshot)
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| runtime("Can only create a map from a list of 2-element lists"))?;
            map.insert(&pair[0], pair[1].clone())?;
        }
        Ok(DataPtr::new(map))
    }

    fn to_vector(&self) -> Result<DataPtr, EvalError> {
        let values = self
            .snapshot()
            .iter()
            .map(|item| {
                item.as_number()
                    .ok_or_else(|| runtime("Non-numeric value in list during conversion to vector"))
            })
            .collect::<Result<Vec<f64>, EvalError>>()?;
        Ok(DataPtr::new(VectorData::new(values)))
    }

    /// Fold the elements with `op`, or pick an extreme with a comparison.
    fn reduce(&self, cx: &Cx<'_>, op: OpCode) -> Result<DataPtr, EvalError> {
        let items = self.snapshot();
        let Some((first, rest)) = items.split_first() else {
            return match op {
                OpCode::Sum => Ok(DataPtr::from_int(0)),
                _ => Err(runtime(format!("Cannot compute {} of an empty list", op.name()))),
            };
        };
        let mut acc = first.clone();
        for item in rest {
            acc = match op {
                OpCode::Sum => dispatch::binary(cx, OpCode::Add, &acc, item)?,
                _ => {
                    let cmp = if op == OpCode::Max { OpCode::Gt } else { OpCode::Lt };
                    let better = dispatch::binary(cx, cmp, item, &acc)?;
                    if better.as_bool().unwrap_or(false) {
                        item.clone()
                    } else {
                        acc
                    }
                }
            };
        }
        Ok(acc)
    }
}

impl Data for ListData {
    fn type_name(&self) -> &'static str {
        "list"
    }

    fn text(&self, cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        let mut out = String::from("[");
        for (i, item) in self.snapshot().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if item.is_missing() {
                out.push(' ');
            } else {
                out.push_str(&dispatch::text(cx, item)?);
            }
        }
        out.push(']');
        Ok(out)
    }

    fn unary(&self, cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        match op {
            OpCode::Len => Ok(DataPtr::from_int(i64::try_from(self.len()).unwrap_or(i64::MAX))),
            OpCode::ToCopy => Ok(DataPtr::new(ListData::new(self.snapshot()))),
            OpCode::ToList => Ok(this.clone()),
            OpCode::ToIter => Ok(DataPtr::new(AccessIter::new(this.clone()))),
            OpCode::Next => Ok(self
                .items
                .lock()
                .pop_front()
                .unwrap_or_else(|| ErrorData::value(out_of_range()))),
            OpCode::Pop => Ok(self
                .items
                .lock()
                .pop_back()
                .unwrap_or_else(|| ErrorData::value(out_of_range()))),
            OpCode::Clear => {
                self.items.lock().clear();
                Ok(DataPtr::missing())
            }
            OpCode::Move => {
                let items = std::mem::take(&mut *self.items.lock());
                Ok(DataPtr::new(ListData { items: Mutex::new(items) }))
            }
            OpCode::ToMap => Ok(self.to_map()?),
            OpCode::ToVector => Ok(self.to_vector()?),
            OpCode::Sum | OpCode::Max | OpCode::Min => Ok(self.reduce(cx, op)?),
            _ => Err(OpFailure::Unimplemented),
        }
    }

    fn at(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr) -> OpResult {
        let index = index_of(index)?;
        let items = self.items.lock();
        let position = checked_index(index, items.len())?;
        Ok(items[position].clone())
    }

    fn put(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr, value: &DataPtr) -> OpResult {
        let index = index_of(index)?;
        let mut items = self.items.lock();
        let position = usize::try_from(index).map_err(|_| index_out_of_range(index, items.len()))?;
        if position >= items.len() {
            items.resize(position + 1, DataPtr::missing());
        }
        items[position] = value.clone();
        Ok(DataPtr::missing())
    }

    fn push(&self, _cx: &Cx<'_>, _this: &DataPtr, value: &DataPtr) -> OpResult {
        self.push_back(value.clone());
        Ok(DataPtr::missing())
    }
}
