//! Bytecode interpreter.
//!
//! [`execute_block`] runs the instructions of one code block against a
//! scope. Each instruction's value is stored in its destination unless the
//! destination is `#`. A `return` raises the block's return signal, which
//! stops every enclosing loop of the same block; the block's value is then
//! the returned value (otherwise it is the value of the last instruction).
//!
//! Errors unwind as `Err`, gaining one trace frame per instruction they
//! leave. Instructions that assign a value (`set`, `put`, `push`, `next`,
//! `print`, ...) store the error in their destination instead when one is
//! given, so it can be inspected with `catch`.

mod calls;
mod commands;
mod control;

pub use calls::close_scope;
pub(crate) use calls::invoke_method;

use crate::data::{CodeData, ErrorData};
use crate::memory::Memory;
use crate::stack::ensure_sufficient_stack;
use crate::vm::{LoadedProgram, Vm};
use crate::{DataPtr, EvalError, EvalResult};
use bb_ir::{BlockSpan, Command, OpCode};
use std::sync::Arc;

/// Execution context: the machine and the current scope.
#[derive(Clone, Copy, Debug)]
pub struct Cx<'a> {
    pub vm: &'a Vm,
    pub memory: &'a Arc<Memory>,
}

impl<'a> Cx<'a> {
    pub fn new(vm: &'a Vm, memory: &'a Arc<Memory>) -> Self {
        Cx { vm, memory }
    }

    /// Same machine, another scope.
    pub fn with_memory<'b>(&'b self, memory: &'b Arc<Memory>) -> Cx<'b> {
        Cx { vm: self.vm, memory }
    }
}

/// Run `code` in `cx.memory`.
///
/// `signal` is raised if the block executed a `return`; the returned value
/// is then the result.
pub fn execute_block(cx: &Cx<'_>, code: &CodeData, signal: &mut bool) -> EvalResult {
    ensure_sufficient_stack(|| run_span(cx, code.program(), code.span(), signal))
}

fn run_span(cx: &Cx<'_>, program: &Arc<LoadedProgram>, span: BlockSpan, signal: &mut bool) -> EvalResult {
    let memory = cx.memory;
    let mut result = DataPtr::missing();
    let mut i = span.start;
    while i < span.optimized_end {
        let command = program.program().command(i);
        match commands::step(cx, program, &mut i, signal) {
            Ok(value) => {
                let dest = command.dest();
                if !dest.is_none() && command.op != OpCode::BeginFinal {
                    memory.set(dest, value.clone()).map_err(|e| e.with_frame(frame(cx, command)))?;
                }
                result = value;
            }
            Err(error) => {
                let error = error.with_frame(frame(cx, command));
                let dest = command.dest();
                if !command.op.stores_errors() || dest.is_none() {
                    return Err(error);
                }
                tracing::trace!(%error, "storing error in destination");
                memory.set(dest, ErrorData::value(error))?;
                result = DataPtr::missing();
            }
        }
        if *signal {
            return Ok(result);
        }
        i += 1;
    }
    Ok(result)
}

/// One trace line for `command`.
fn frame(cx: &Cx<'_>, command: &Command) -> String {
    let origin = &command.origin;
    let text = command.describe(cx.vm.symbols());
    format!("{text:<40} {} line {}", origin.path, origin.line)
}

/// `value` as code, or a type error naming its `role`.
fn expect_code<'v>(value: &'v DataPtr, role: &'static str) -> Result<&'v CodeData, EvalError> {
    value
        .downcast::<CodeData>()
        .ok_or_else(|| crate::errors::type_mismatch(role, value.type_name()))
}
