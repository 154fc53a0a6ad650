//! Calls, struct construction and scope teardown.

use super::{execute_block, expect_code, Cx};
use crate::concurrency::ThreadPermit;
use crate::data::{CodeData, FutureData, ListData, Obj, StructData};
use crate::errors::runtime;
use crate::memory::Memory;
use crate::{DataPtr, EvalError, EvalResult};
use bb_ir::{Command, SymbolId};
use std::sync::Arc;

/// Finish a scope: run its deferred blocks, join its tasks and report
/// unhandled errors.
///
/// On success the block value is returned, with code values cut loose
/// from the ending scope. On failure the original error wins; teardown
/// problems found on the way are only logged.
pub fn close_scope(cx: &Cx<'_>, scope: &Arc<Memory>, outcome: EvalResult) -> EvalResult {
    let deferred = run_deferred(&cx.with_memory(scope));
    match outcome {
        Ok(value) => {
            deferred?;
            scope.release(&value)?;
            Ok(detach_code(value))
        }
        Err(error) => {
            if let Err(secondary) = scope.release(&DataPtr::missing()) {
                tracing::debug!(%secondary, "teardown error while unwinding");
            }
            Err(error)
        }
    }
}

/// Run the blocks queued with `defer`, in registration order.
///
/// Every block runs even if one fails; the first failure is returned.
fn run_deferred(cx: &Cx<'_>) -> Result<(), EvalError> {
    let mut first_error = None;
    for block in cx.memory.take_deferred() {
        let Some(code) = block.downcast::<CodeData>() else {
            continue;
        };
        let mut signal = false;
        if let Err(error) = execute_block(cx, code, &mut signal) {
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Code leaving its scope no longer refers to it.
fn detach_code(value: DataPtr) -> DataPtr {
    match value.downcast::<CodeData>() {
        Some(code) if code.declaration().is_some() => DataPtr::new(code.rebound(None)),
        _ => value,
    }
}

/// `call dest context callee`.
pub(super) fn call(cx: &Cx<'_>, command: &Command) -> EvalResult {
    let memory = cx.memory;
    let context = match command.arg(1) {
        id if id.is_none() => None,
        id => Some(memory.get(id)?),
    };
    let callee = memory.get(command.arg(2))?;
    let (code, this, may_spawn) = resolve_callee(&callee)?;

    let scope = Memory::child(memory);
    if let Some(context) = context {
        let setup = expect_code(&context, "code block")?;
        let mut signal = false;
        let value = execute_block(&cx.with_memory(&scope), setup, &mut signal);
        if signal || value.is_err() {
            return close_scope(cx, &scope, value);
        }
    }
    if let Some(this) = this {
        bind_this(&scope, this);
    }
    scope.set_allow_mutables(false);

    if may_spawn && code.is_parallel() {
        if let Some(permit) = cx.vm.gate().try_acquire() {
            return spawn(cx, code, scope, permit);
        }
    }
    run_invocation(cx, &code, &scope)
}

/// `this` stays visible to nested blocks once mutables are hidden.
fn bind_this(scope: &Memory, this: DataPtr) {
    scope.set_unchecked(SymbolId::THIS, this);
    scope.set_final(SymbolId::THIS);
}

/// Code to run for `callee`, the `this` to bind, and whether the call may
/// go to a background thread.
fn resolve_callee(callee: &DataPtr) -> Result<(CodeData, Option<DataPtr>, bool), EvalError> {
    if let Some(code) = callee.downcast::<CodeData>() {
        let this = code
            .declaration()
            .map(|declaration| declaration.get_or_null(SymbolId::THIS, true))
            .transpose()?
            .flatten();
        return Ok((code.clone(), this, true));
    }
    if let Some(object) = callee.downcast::<StructData>() {
        let method = object
            .memory()
            .get_or_null_shallow(SymbolId::CALL)?
            .ok_or_else(|| runtime("Struct was called like a method but has no implemented code for `call`"))?;
        let code = expect_code(&method, "code block")?.rebound(Some(object.memory()));
        return Ok((code, Some(callee.clone()), false));
    }
    Err(runtime(format!(
        "Only structs or code blocks can be called, not {}",
        callee.type_name()
    )))
}

fn run_invocation(cx: &Cx<'_>, code: &CodeData, scope: &Arc<Memory>) -> EvalResult {
    let mut signal = false;
    let outcome = execute_block(&cx.with_memory(scope), code, &mut signal);
    close_scope(cx, scope, outcome)
}

/// Run the call on a background thread and return its future.
fn spawn(cx: &Cx<'_>, code: CodeData, scope: Arc<Memory>, permit: ThreadPermit) -> EvalResult {
    let vm = cx.vm.clone();
    let future = FutureData::spawn(move || {
        let _permit = permit;
        run_invocation(&Cx::new(&vm, &scope), &code, &scope)
    })?;
    tracing::trace!(active = cx.vm.gate().active(), "spawned background call");
    cx.memory.attach(Arc::clone(&future));
    let future: Obj = future;
    Ok(DataPtr::from_obj(future))
}

/// Call an overload field of a struct with explicit `args`.
pub(crate) fn invoke_method(cx: &Cx<'_>, name: &str, method: &DataPtr, this: &DataPtr, args: Vec<DataPtr>) -> EvalResult {
    let code = method
        .downcast::<CodeData>()
        .ok_or_else(|| runtime(format!("Struct field {name} is not a code block")))?;
    let scope = Memory::child(cx.memory);
    scope.set_unchecked(SymbolId::ARGS, DataPtr::new(ListData::new(args)));
    bind_this(&scope, this.clone());
    scope.set_allow_mutables(false);
    run_invocation(cx, code, &scope)
}

/// `new dest body`.
pub(super) fn new_struct(cx: &Cx<'_>, command: &Command) -> EvalResult {
    let body = cx.memory.get(command.arg(1))?;
    let code = expect_code(&body, "code block")?;

    let scope = Memory::child(cx.memory);
    let object = Arc::new(StructData::new(Arc::clone(&scope)));
    scope.set_this_object(&object);
    let object: Obj = object;
    let this = DataPtr::from_obj(object);

    let mut signal = false;
    let inner = cx.with_memory(&scope);
    let outcome = execute_block(&inner, code, &mut signal);
    let deferred = run_deferred(&inner);
    let detached = scope.detach();
    let value = outcome?;
    deferred?;
    detached?;

    if signal && !value.is_same(&this) {
        return Ok(value);
    }
    Ok(this)
}

/// `default # body`: run `body` in a child scope and adopt the bindings
/// the current scope lacks.
pub(super) fn default(cx: &Cx<'_>, command: &Command) -> EvalResult {
    let body = cx.memory.get(command.arg(1))?;
    let code = expect_code(&body, "code block")?;

    let scope = Memory::child(cx.memory);
    let inner = cx.with_memory(&scope);
    let mut signal = false;
    let outcome = execute_block(&inner, code, &mut signal);
    let deferred = run_deferred(&inner);
    let joined = scope.join_attached();
    outcome?;
    deferred?;
    joined?;
    if signal {
        return Err(runtime("Cannot return from within a `default` statement"));
    }
    cx.memory.replace_missing(&scope)?;
    Ok(DataPtr::missing())
}
