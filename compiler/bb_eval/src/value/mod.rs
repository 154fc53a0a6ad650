//! The tagged value every slot, operand and result holds.
//!
//! A [`DataPtr`] is either an inline literal (float, int, bool) or a
//! possibly-null pointer to a heap [`Data`] object. A null pointer means
//! "missing". Literals never touch the heap, which is what makes the
//! arithmetic fast path cheap.
//!
//! Heap objects are shared through `Arc`: cloning a `DataPtr` adds an
//! owner, dropping one removes it, and the object is destroyed exactly when
//! the last owner goes away.

use crate::data::{string_value, Data, ErrorData, Obj};
use bb_ir::Literal;
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

bitflags! {
    /// Property bits carried next to the payload.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ValueFlags: u8 {
        const A = 1;
        const B = 1 << 1;
        /// Pointee is an error object.
        const ERROR = 1 << 2;
    }
}

#[derive(Clone)]
enum Payload {
    Float(f64),
    Int(i64),
    Bool(bool),
    Obj(Option<Obj>),
}

/// Tagged runtime value.
#[derive(Clone)]
pub struct DataPtr {
    payload: Payload,
    flags: ValueFlags,
}

impl DataPtr {
    #[inline]
    pub fn missing() -> Self {
        DataPtr {
            payload: Payload::Obj(None),
            flags: ValueFlags::empty(),
        }
    }

    #[inline]
    pub fn from_int(v: i64) -> Self {
        DataPtr {
            payload: Payload::Int(v),
            flags: ValueFlags::empty(),
        }
    }

    #[inline]
    pub fn from_float(v: f64) -> Self {
        DataPtr {
            payload: Payload::Float(v),
            flags: ValueFlags::empty(),
        }
    }

    #[inline]
    pub fn from_bool(v: bool) -> Self {
        DataPtr {
            payload: Payload::Bool(v),
            flags: ValueFlags::empty(),
        }
    }

    /// Wrap a shared heap object.
    pub fn from_obj(obj: Obj) -> Self {
        let flags = if (*obj).as_any().is::<ErrorData>() {
            ValueFlags::ERROR
        } else {
            ValueFlags::empty()
        };
        DataPtr {
            payload: Payload::Obj(Some(obj)),
            flags,
        }
    }

    /// Value of a `BUILTIN` constant.
    pub fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Int(v) => Self::from_int(*v),
            Literal::Float(v) => Self::from_float(*v),
            Literal::Bool(v) => Self::from_bool(*v),
            Literal::Str(s) => string_value(Arc::clone(s)),
        }
    }

    /// Move `data` to the heap and wrap it.
    pub fn new<T: Data>(data: T) -> Self {
        Self::from_obj(Arc::new(data))
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self.payload {
            Payload::Int(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self.payload {
            Payload::Float(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.payload {
            Payload::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric literal widened to float.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self.payload {
            Payload::Int(v) => Some(v as f64),
            Payload::Float(v) => Some(v),
            _ => None,
        }
    }

    /// True for inline float, int and bool values.
    #[inline]
    pub fn is_literal(&self) -> bool {
        !matches!(self.payload, Payload::Obj(_))
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self.payload, Payload::Obj(None))
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.flags.contains(ValueFlags::ERROR)
    }

    /// Heap object, if this is a non-null pointer.
    #[inline]
    pub fn obj(&self) -> Option<&Obj> {
        match &self.payload {
            Payload::Obj(obj) => obj.as_ref(),
            _ => None,
        }
    }

    /// Borrow the heap object as a concrete type.
    pub fn downcast<T: Data>(&self) -> Option<&T> {
        let obj: &dyn Data = &**self.obj()?;
        obj.as_any().downcast_ref::<T>()
    }

    /// Shared handle to the heap object as a concrete type.
    pub fn downcast_arc<T: Data>(&self) -> Option<Arc<T>> {
        let obj = Arc::clone(self.obj()?);
        obj.into_any().downcast::<T>().ok()
    }

    pub fn error(&self) -> Option<&ErrorData> {
        if self.is_error() {
            self.downcast::<ErrorData>()
        } else {
            None
        }
    }

    pub fn flags(&self) -> ValueFlags {
        self.flags
    }

    /// Set or clear the user-visible property bits (`A`, `B`).
    ///
    /// The `ERROR` bit tracks the pointee and cannot be changed here.
    pub fn set_flag(&mut self, flag: ValueFlags, on: bool) {
        let flag = flag - ValueFlags::ERROR;
        self.flags.set(flag, on);
    }

    /// Number of owners of the pointee; literals and missing report 0.
    pub fn owners(&self) -> usize {
        self.obj().map_or(0, Arc::strong_count)
    }

    /// Same heap object as decided by the pointee, or equal literal
    /// payload.
    pub fn is_same(&self, other: &DataPtr) -> bool {
        match (&self.payload, &other.payload) {
            (Payload::Obj(Some(obj)), Payload::Obj(Some(_))) => obj.is_same(self, other),
            (Payload::Obj(None), Payload::Obj(None)) => true,
            (Payload::Int(a), Payload::Int(b)) => a == b,
            (Payload::Bool(a), Payload::Bool(b)) => a == b,
            (Payload::Float(a), Payload::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match &self.payload {
            Payload::Int(_) => "int",
            Payload::Float(_) => "float",
            Payload::Bool(_) => "bool",
            Payload::Obj(None) => "missing",
            Payload::Obj(Some(obj)) => obj.type_name(),
        }
    }

    /// Text of a literal; `None` for heap values, whose text may require
    /// running user code.
    pub fn literal_text(&self) -> Option<String> {
        match self.payload {
            Payload::Int(v) => Some(v.to_string()),
            Payload::Float(v) => Some(v.to_string()),
            Payload::Bool(v) => Some(v.to_string()),
            Payload::Obj(_) => None,
        }
    }
}

impl Default for DataPtr {
    fn default() -> Self {
        Self::missing()
    }
}

impl fmt::Debug for DataPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Payload::Int(v) => write!(f, "Int({v})"),
            Payload::Float(v) => write!(f, "Float({v})"),
            Payload::Bool(v) => write!(f, "Bool({v})"),
            Payload::Obj(None) => f.write_str("Missing"),
            Payload::Obj(Some(obj)) => write!(f, "{obj:?}"),
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
