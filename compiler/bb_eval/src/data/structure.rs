use super::{Data, OpFailure, OpResult, Side};
use crate::interpreter::invoke_method;
use crate::memory::Memory;
use crate::{dispatch, Cx, DataPtr, EvalError};
use bb_ir::OpCode;
use std::sync::Arc;

/// Object created by `new`: a detached scope whose bindings are its
/// fields.
///
/// Operators on a struct call its overload fields (`\add`, `\radd` when
/// the struct is the right operand, `\str`, `\at`, ...) with `this` bound
/// to the struct and `args` holding the other operands.
#[derive(Debug)]
pub struct StructData {
    memory: Arc<Memory>,
}

impl StructData {
    pub fn new(memory: Arc<Memory>) -> Self {
        StructData { memory }
    }

    pub fn memory(&self) -> &Arc<Memory> {
        &self.memory
    }

    /// Overload field `name`, if the struct defines it.
    fn overload(&self, cx: &Cx<'_>, name: &str) -> Result<Option<DataPtr>, EvalError> {
        let Some(id) = cx.vm.symbols().lookup(name) else {
            return Ok(None);
        };
        self.memory.get_or_null_shallow(id)
    }

    fn invoke(&self, cx: &Cx<'_>, this: &DataPtr, name: &str, args: Vec<DataPtr>) -> OpResult {
        let Some(method) = self.overload(cx, name)? else {
            return Err(OpFailure::Unimplemented);
        };
        Ok(invoke_method(cx, name, &method, this, args)?)
    }
}

impl Data for StructData {
    fn type_name(&self) -> &'static str {
        "struct"
    }

    fn text(&self, cx: &Cx<'_>, this: &DataPtr) -> Result<String, EvalError> {
        match self.invoke(cx, this, "\\str", Vec::new()) {
            Ok(value) => dispatch::text(cx, &value),
            Err(OpFailure::Failed(error)) => Err(error),
            Err(OpFailure::Unimplemented) => Ok("struct".to_string()),
        }
    }

    fn binary(&self, cx: &Cx<'_>, op: OpCode, this: &DataPtr, other: &DataPtr, side: Side) -> OpResult {
        let Some(name) = op.overload_name() else {
            return Err(OpFailure::Unimplemented);
        };
        match side {
            Side::Left => self.invoke(cx, this, name, vec![other.clone()]),
            Side::Right => {
                let args = vec![other.clone()];
                if let Some(mirrored) = op.mirrored_overload_name() {
                    match self.invoke(cx, this, mirrored, args.clone()) {
                        Err(OpFailure::Unimplemented) => {}
                        done => return done,
                    }
                }
                if op.is_commutative() {
                    return self.invoke(cx, this, name, args);
                }
                Err(OpFailure::Unimplemented)
            }
        }
    }

    fn unary(&self, cx: &Cx<'_>, op: OpCode, this: &DataPtr) -> OpResult {
        let Some(name) = op.overload_name() else {
            return Err(OpFailure::Unimplemented);
        };
        match self.invoke(cx, this, name, Vec::new()) {
            Err(OpFailure::Unimplemented) if op == OpCode::ToCopy => Ok(this.clone()),
            done => done,
        }
    }

    fn at(&self, cx: &Cx<'_>, this: &DataPtr, index: &DataPtr) -> OpResult {
        self.invoke(cx, this, "\\at", vec![index.clone()])
    }

    fn put(&self, cx: &Cx<'_>, this: &DataPtr, index: &DataPtr, value: &DataPtr) -> OpResult {
        self.invoke(cx, this, "\\put", vec![index.clone(), value.clone()])
    }

    fn push(&self, cx: &Cx<'_>, this: &DataPtr, value: &DataPtr) -> OpResult {
        self.invoke(cx, this, "\\push", vec![value.clone()])
    }
}
