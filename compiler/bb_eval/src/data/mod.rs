//! Heap objects.
//!
//! Every non-literal value implements [`Data`]. The trait is the generic
//! operation protocol: each operation has a default that reports
//! [`OpFailure::Unimplemented`], and concrete types override what they
//! support. The dispatcher (see [`crate::dispatch`]) turns an
//! unimplemented answer into the next candidate or into a user-visible
//! error.
//!
//! New data kinds (files, sockets, graphics handles) plug in by
//! implementing [`Data`]; nothing else in the interpreter needs to know
//! about them.

mod code;
mod error;
mod future;
mod iterator;
mod list;
mod map;
mod structure;
mod text;
mod vector;

pub use code::CodeData;
pub use error::ErrorData;
pub use future::FutureData;
pub use iterator::{AccessIter, FloatRange, IntRange};
pub use list::ListData;
pub use map::{MapData, MapKey};
pub use structure::StructData;
pub use text::{string_value, StringData};
pub use vector::VectorData;

use crate::{Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a heap object.
pub type Obj = Arc<dyn Data>;

/// Which operand of a binary operation the receiver is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    /// Mirrored dispatch: the receiver is the right operand.
    Right,
}

/// Why an operation produced no value.
#[derive(Debug)]
pub enum OpFailure {
    /// The receiver does not support the operation; try the next candidate.
    Unimplemented,
    /// The operation is supported but failed.
    Failed(EvalError),
}

impl From<EvalError> for OpFailure {
    fn from(error: EvalError) -> Self {
        OpFailure::Failed(error)
    }
}

pub type OpResult = Result<DataPtr, OpFailure>;

/// Downcasting support for [`Data`] trait objects.
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A heap object and the operations it supports.
///
/// `this` is always the [`DataPtr`] the receiver was reached through, so an
/// implementation can hand itself out (iterators returning themselves,
/// structs binding `this`).
pub trait Data: AsAny + fmt::Debug {
    fn type_name(&self) -> &'static str;

    /// Text used by `print` and `str`.
    fn text(&self, _cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        Ok(self.type_name().to_string())
    }

    fn binary(&self, _cx: &Cx<'_>, _op: OpCode, _this: &DataPtr, _other: &DataPtr, _side: Side) -> OpResult {
        Err(OpFailure::Unimplemented)
    }

    fn unary(&self, _cx: &Cx<'_>, _op: OpCode, _this: &DataPtr) -> OpResult {
        Err(OpFailure::Unimplemented)
    }

    fn at(&self, _cx: &Cx<'_>, _this: &DataPtr, _index: &DataPtr) -> OpResult {
        Err(OpFailure::Unimplemented)
    }

    fn put(&self, _cx: &Cx<'_>, _this: &DataPtr, _index: &DataPtr, _value: &DataPtr) -> OpResult {
        Err(OpFailure::Unimplemented)
    }

    fn push(&self, _cx: &Cx<'_>, _this: &DataPtr, _value: &DataPtr) -> OpResult {
        Err(OpFailure::Unimplemented)
    }

    /// Whether `other` denotes the same object as `this`. Objects are
    /// distinct unless they are the same allocation.
    fn is_same(&self, this: &DataPtr, other: &DataPtr) -> bool {
        match (this.obj(), other.obj()) {
            (Some(a), Some(b)) => std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>()),
            _ => false,
        }
    }

    /// Copy made when a binding is pulled into another scope.
    ///
    /// Immutable objects share themselves.
    fn shallow_copy(&self, this: &DataPtr) -> DataPtr {
        this.clone()
    }
}

/// Integer index operand, or a type error naming the operation.
pub(crate) fn index_of(index: &DataPtr) -> Result<i64, OpFailure> {
    index.as_int().ok_or(OpFailure::Unimplemented)
}

/// Position `index` in a container of `len` elements.
pub(crate) fn checked_index(index: i64, len: usize) -> Result<usize, EvalError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| crate::errors::index_out_of_range(index, len))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
