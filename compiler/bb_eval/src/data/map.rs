use super::{AccessIter, Data, ListData, OpFailure, OpResult, StringData};
use crate::errors::{runtime, type_mismatch};
use crate::{dispatch, Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Hashable projection of a value usable as a map key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Bool(bool),
    Float(u64),
    Str(Arc<str>),
}

impl MapKey {
    pub fn of(value: &DataPtr) -> Result<MapKey, EvalError> {
        if let Some(v) = value.as_int() {
            return Ok(MapKey::Int(v));
        }
        if let Some(v) = value.as_bool() {
            return Ok(MapKey::Bool(v));
        }
        if let Some(v) = value.as_float() {
            return Ok(MapKey::Float(v.to_bits()));
        }
        if let Some(s) = value.downcast::<StringData>() {
            return Ok(MapKey::Str(Arc::from(s.as_str())));
        }
        Err(type_mismatch("int, float, bool or str key", value.type_name()))
    }
}

#[derive(Debug, Default)]
struct Entries {
    slots: FxHashMap<MapKey, usize>,
    pairs: Vec<(DataPtr, DataPtr)>,
}

/// Insertion-ordered hash map.
#[derive(Debug, Default)]
pub struct MapData {
    entries: Mutex<Entries>,
}

impl MapData {
    pub fn insert(&self, key: &DataPtr, value: DataPtr) -> Result<(), EvalError> {
        let hashed = MapKey::of(key)?;
        let mut entries = self.entries.lock();
        if let Some(&slot) = entries.slots.get(&hashed) {
            entries.pairs[slot].1 = value;
        } else {
            let slot = entries.pairs.len();
            entries.pairs.push((key.clone(), value));
            entries.slots.insert(hashed, slot);
        }
        Ok(())
    }

    pub fn get(&self, key: &DataPtr) -> Result<Option<DataPtr>, EvalError> {
        let hashed = MapKey::of(key)?;
        let entries = self.entries.lock();
        Ok(entries.slots.get(&hashed).map(|&slot| entries.pairs[slot].1.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pairs(&self) -> Vec<(DataPtr, DataPtr)> {
        self.entries.lock().pairs.clone()
    }

    fn keys(&self) -> Vec<DataPtr> {
        self.entries.lock().pairs.iter().map(|(k, _)| k.clone()).collect()
    }
}

impl Data for MapData {
    fn type_name(&self) -> &'static str {
        "map"
    }

    fn text(&self, cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        let mut out = String::from("{");
        for (i, (key, value)) in self.pairs().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&dispatch::text(cx, key)?);
            out.push_str(": ");
            out.push_str(&dispatch::text(cx, value)?);
        }
        out.push('}');
        Ok(out)
    }

    fn unary(&self, _cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        match op {
            OpCode::Len => Ok(DataPtr::from_int(i64::try_from(self.len()).unwrap_or(i64::MAX))),
            OpCode::ToMap => Ok(this.clone()),
            OpCode::ToCopy => {
                let copy = MapData::default();
                for (key, value) in self.pairs() {
                    copy.insert(&key, value)?;
                }
                Ok(DataPtr::new(copy))
            }
            OpCode::ToList => {
                let rows = self
                    .pairs()
                    .into_iter()
                    .map(|(k, v)| DataPtr::new(ListData::new([k, v])));
                Ok(DataPtr::new(ListData::new(rows)))
            }
            OpCode::ToIter => {
                let keys = DataPtr::new(ListData::new(self.keys()));
                Ok(DataPtr::new(AccessIter::new(keys)))
            }
            OpCode::Clear => {
                *self.entries.lock() = Entries::default();
                Ok(DataPtr::missing())
            }
            _ => Err(OpFailure::Unimplemented),
        }
    }

    fn at(&self, cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr) -> OpResult {
        match self.get(index)? {
            Some(value) => Ok(value),
            None => Err(runtime(format!("Map has no key: {}", dispatch::text(cx, index)?)).into()),
        }
    }

    fn put(&self, _cx: &Cx<'_>, _this: &DataPtr, index: &DataPtr, value: &DataPtr) -> OpResult {
        self.insert(index, value.clone())?;
        Ok(DataPtr::missing())
    }
}
