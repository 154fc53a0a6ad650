//! Branches, loops, error interception and cached blocks.

use super::{execute_block, expect_code, Cx};
use crate::data::{CodeData, ErrorData, StructData};
use crate::errors::{runtime, type_mismatch};
use crate::memory::Memory;
use crate::vm::LoadedProgram;
use crate::{dispatch, DataPtr, EvalError, EvalResult};
use bb_ir::Command;
use std::sync::Arc;

/// Run `code` in the current scope, trying its accelerator first.
fn run_here(cx: &Cx<'_>, code: &CodeData, signal: &mut bool) -> EvalResult {
    if let Some(jit) = code.jit() {
        let mut result = DataPtr::missing();
        if jit.run(cx.memory, &mut result, signal) {
            return Ok(result);
        }
    }
    execute_block(cx, code, signal)
}

/// Truth value of a condition operand. Code conditions are executed in
/// the current scope.
fn truth(cx: &Cx<'_>, condition: &DataPtr) -> Result<bool, EvalError> {
    if let Some(value) = condition.as_bool() {
        return Ok(value);
    }
    dispatch::propagate_error(condition)?;
    let Some(code) = condition.downcast::<CodeData>() else {
        return Err(type_mismatch("bool", condition.type_name()));
    };
    let mut signal = false;
    if let Some(jit) = code.jit() {
        let mut result = false;
        if jit.run_with_boolean_intent(cx.memory, &mut result, &mut signal) {
            return Ok(result);
        }
    }
    let value = execute_block(cx, code, &mut signal)?;
    dispatch::propagate_error(&value)?;
    value
        .as_bool()
        .ok_or_else(|| type_mismatch("bool", value.type_name()))
}

/// `inline dest source`: code runs in this scope; a struct's fields are
/// copied into it.
pub(super) fn inline(cx: &Cx<'_>, source: &DataPtr, signal: &mut bool) -> EvalResult {
    if let Some(code) = source.downcast::<CodeData>() {
        return run_here(cx, code, signal);
    }
    if let Some(object) = source.downcast::<StructData>() {
        cx.memory.pull(object.memory())?;
        return Ok(DataPtr::missing());
    }
    Err(type_mismatch("code block or struct", source.type_name()))
}

/// `if # cond accept [reject]`.
pub(super) fn branch(cx: &Cx<'_>, command: &Command, signal: &mut bool) -> EvalResult {
    let memory = cx.memory;
    let condition = memory.get(command.arg(1))?;
    let chosen = if truth(cx, &condition)? {
        Some(memory.get(command.arg(2))?)
    } else if command.args.len() > 3 {
        Some(memory.get(command.arg(3))?)
    } else {
        None
    };
    match chosen {
        Some(value) => match value.downcast::<CodeData>() {
            Some(code) => run_here(cx, code, signal),
            None => Ok(value),
        },
        None => Ok(DataPtr::missing()),
    }
}

/// `while # cond body`. The condition operand is re-read every iteration.
pub(super) fn repeat(cx: &Cx<'_>, command: &Command, signal: &mut bool) -> EvalResult {
    let memory = cx.memory;
    let body = memory.get(command.arg(2))?;
    let body = expect_code(&body, "code block")?;
    loop {
        let condition = memory.get(command.arg(1))?;
        if !truth(cx, &condition)? {
            return Ok(DataPtr::missing());
        }
        let value = run_here(cx, body, signal)?;
        if *signal {
            return Ok(value);
        }
    }
}

/// `try dest body`: the body's returned value, the error it raised, or a
/// consumed marker error when it did neither.
pub(super) fn attempt(cx: &Cx<'_>, body: &DataPtr) -> EvalResult {
    let code = expect_code(body, "code block")?;
    cx.memory.join_attached()?;
    let mut signal = false;
    let outcome = execute_block(cx, code, &mut signal);
    let joined = cx.memory.join_attached();
    match (outcome, joined) {
        (Err(error), _) | (Ok(_), Err(error)) => {
            tracing::trace!(%error, "intercepted error");
            Ok(ErrorData::value(error))
        }
        (Ok(value), Ok(())) if signal => Ok(value),
        (Ok(_), Ok(())) => Ok(ErrorData::consumed_value(runtime(
            "No error or return statement intercepted with `try`",
        ))),
    }
}

/// `catch dest cond accept [reject]`.
pub(super) fn catch(cx: &Cx<'_>, command: &Command, signal: &mut bool) -> EvalResult {
    let memory = cx.memory;
    let condition = memory.get_or_null(command.arg(1), true)?.unwrap_or_default();
    let chosen = match condition.error() {
        Some(error) => {
            error.consume();
            Some(command.arg(2))
        }
        None if command.args.len() > 3 => Some(command.arg(3)),
        None => None,
    };
    let Some(chosen) = chosen else {
        return Ok(DataPtr::missing());
    };
    let block = memory.get(chosen)?;
    run_here(cx, expect_code(&block, "code block")?, signal)
}

/// `BEGINCACHE name ... END`: run the block once per machine and keep its
/// bindings in the cache scope.
pub(super) fn begin_cache(cx: &Cx<'_>, program: &Arc<LoadedProgram>, i: &mut usize) -> EvalResult {
    let span = program
        .program()
        .block(*i)
        .ok_or_else(|| runtime("Unmatched block opener"))?;
    *i = span.end;

    let _guard = cx.vm.lock_cache();
    if !cx.vm.mark_cached(program.id(), span.begin) {
        return Ok(DataPtr::missing());
    }
    tracing::debug!(begin = span.begin, "running cached block");
    let scope = Memory::child(cx.memory);
    let code = CodeData::new(program, span, Some(cx.memory));
    let mut signal = false;
    let outcome = execute_block(&cx.with_memory(&scope), &code, &mut signal);
    let joined = scope.join_attached();
    outcome?;
    joined?;
    if signal {
        return Err(runtime("Cannot return from within a cached block"));
    }
    cx.vm.cache().pull(&scope)?;
    Ok(DataPtr::missing())
}
