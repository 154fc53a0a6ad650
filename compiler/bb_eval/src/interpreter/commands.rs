//! Per-instruction semantics.

use super::{calls, control, expect_code, Cx};
use crate::data::{string_value, CodeData, FloatRange, IntRange, ListData, MapData, StructData, VectorData};
use crate::errors::{failure, missing_value, runtime, type_mismatch};
use crate::vm::LoadedProgram;
use crate::{dispatch, DataPtr, EvalError, EvalResult};
use bb_ir::{Command, OpCode, SymbolId};
use std::sync::Arc;

/// Execute the instruction at `*i` and return its value.
///
/// Block openers move `*i` to their `END`.
pub(super) fn step(cx: &Cx<'_>, program: &Arc<LoadedProgram>, i: &mut usize, signal: &mut bool) -> EvalResult {
    let command = program.program().command(*i);
    let memory = cx.memory;
    let get = |slot: usize| memory.get(command.arg(slot));

    match command.op {
        OpCode::Builtin => program
            .literal(*i)
            .cloned()
            .ok_or_else(|| runtime("BUILTIN without a literal")),

        OpCode::Begin | OpCode::BeginFinal => {
            let span = program
                .program()
                .block(*i)
                .ok_or_else(|| runtime("Unmatched block opener"))?;
            *i = span.end;
            let code = DataPtr::new(CodeData::new(program, span, Some(memory)));
            if command.op == OpCode::BeginFinal {
                memory.set(command.dest(), code.clone())?;
                memory.set_final(command.dest());
            }
            Ok(code)
        }
        OpCode::BeginCache => control::begin_cache(cx, program, i),
        OpCode::End => Ok(DataPtr::missing()),

        OpCode::Return => {
            let value = if command.arg(1).is_none() {
                DataPtr::missing()
            } else {
                get(1)?
            };
            *signal = true;
            Ok(value)
        }

        OpCode::Not
        | OpCode::Len
        | OpCode::Log
        | OpCode::Pop
        | OpCode::Next
        | OpCode::ToInt
        | OpCode::ToFloat
        | OpCode::ToStr
        | OpCode::ToBool
        | OpCode::ToCopy
        | OpCode::Sum
        | OpCode::Max
        | OpCode::Min
        | OpCode::ToIter
        | OpCode::Clear
        | OpCode::Move => dispatch::unary(cx, command.op, &get(1)?),

        OpCode::And
        | OpCode::Or
        | OpCode::Eq
        | OpCode::Neq
        | OpCode::Le
        | OpCode::Ge
        | OpCode::Lt
        | OpCode::Gt
        | OpCode::Add
        | OpCode::Sub
        | OpCode::Mul
        | OpCode::MMul
        | OpCode::Div
        | OpCode::Mod
        | OpCode::Pow => dispatch::binary(cx, command.op, &get(1)?, &get(2)?),

        OpCode::At => dispatch::at(cx, &get(1)?, &get(2)?),
        OpCode::Put => dispatch::put(cx, &get(1)?, &get(2)?, &get(3)?),
        OpCode::Push => dispatch::push(cx, &get(1)?, &get(2)?),

        OpCode::ToList => {
            let items = values(cx, command)?;
            Ok(DataPtr::new(ListData::new(items)))
        }
        OpCode::ToMap => match command.sources() {
            [] => Ok(DataPtr::new(MapData::default())),
            _ => dispatch::unary(cx, OpCode::ToMap, &get(1)?),
        },
        OpCode::ToVector => match command.sources() {
            [] => Ok(DataPtr::new(VectorData::new(Vec::new()))),
            _ => {
                let source = get(1)?;
                match source.as_int() {
                    Some(size) => zeros(size),
                    None => dispatch::unary(cx, OpCode::ToVector, &source),
                }
            }
        },
        OpCode::ToRange => range(&values(cx, command)?),

        OpCode::Is => {
            let value = get(1)?;
            dispatch::propagate_error(&value)?;
            Ok(value)
        }
        OpCode::As => {
            let value = memory
                .get_or_null(command.arg(1), true)?
                .ok_or_else(|| missing_value(&cx.vm.symbols().name(command.arg(1))))?;
            if let Some(error) = value.error() {
                error.consume();
            }
            Ok(value)
        }
        OpCode::Exists => {
            let value = memory.get_or_null(command.arg(1), true)?;
            Ok(DataPtr::from_bool(value.is_some_and(|v| !v.is_error())))
        }
        OpCode::Final => {
            memory.set_final(command.arg(1));
            Ok(DataPtr::missing())
        }

        OpCode::Get => get_field(cx, &get(1)?, command.arg(2)),
        OpCode::Set => {
            let object = get(1)?;
            let target = object
                .downcast::<StructData>()
                .ok_or_else(|| type_mismatch("struct", object.type_name()))?;
            let value = memory.get_or_null(command.arg(3), true)?.unwrap_or_default();
            target.memory().set(command.arg(2), value)?;
            Ok(DataPtr::missing())
        }
        OpCode::SetFinal => {
            let object = get(1)?;
            let value = get(3)?;
            if let Some(code) = object.downcast::<CodeData>() {
                code.set_metadata(command.arg(2), value)?;
            } else if let Some(target) = object.downcast::<StructData>() {
                target.memory().set(command.arg(2), value)?;
                target.memory().set_final(command.arg(2));
            } else {
                return Err(type_mismatch("struct or code", object.type_name()));
            }
            Ok(DataPtr::missing())
        }

        OpCode::Print => {
            let line = texts(cx, command)?;
            cx.vm.console().println(&line);
            Ok(DataPtr::missing())
        }
        OpCode::Read => {
            let prompt = texts(cx, command)?;
            let console = cx.vm.console();
            console.print(&prompt);
            Ok(string_value(console.read_line()?))
        }
        OpCode::Time => Ok(DataPtr::from_float(cx.vm.elapsed())),
        OpCode::Fail => {
            let value = get(1)?;
            Err(failure(dispatch::text(cx, &value)?))
        }
        OpCode::IsCached => cx
            .vm
            .cache()
            .get_or_null_shallow(command.arg(1))?
            .ok_or_else(|| missing_value(&cx.vm.symbols().name(command.arg(1)))),

        OpCode::Call => calls::call(cx, command),
        OpCode::New => calls::new_struct(cx, command),
        OpCode::Default => calls::default(cx, command),
        OpCode::Inline => control::inline(cx, &get(1)?, signal),
        OpCode::If => control::branch(cx, command, signal),
        OpCode::While => control::repeat(cx, command, signal),
        OpCode::Try => control::attempt(cx, &get(1)?),
        OpCode::Catch => control::catch(cx, command, signal),
        OpCode::Defer => {
            let block = get(1)?;
            expect_code(&block, "code block")?;
            memory.defer(block);
            Ok(DataPtr::missing())
        }
    }
}

/// Values of every source operand.
fn values(cx: &Cx<'_>, command: &Command) -> Result<Vec<DataPtr>, EvalError> {
    command.sources().iter().map(|&id| cx.memory.get(id)).collect()
}

/// Source operand texts joined by spaces.
fn texts(cx: &Cx<'_>, command: &Command) -> Result<String, EvalError> {
    let parts = values(cx, command)?
        .iter()
        .map(|value| dispatch::text(cx, value))
        .collect::<Result<Vec<String>, EvalError>>()?;
    Ok(parts.join(" "))
}

fn zeros(size: i64) -> EvalResult {
    let size = usize::try_from(size).map_err(|_| runtime(format!("Negative vector size: {size}")))?;
    Ok(DataPtr::new(VectorData::new(vec![0.0; size])))
}

/// `range(last)`, `range(first, last)` or `range(first, last, step)`.
fn range(bounds: &[DataPtr]) -> EvalResult {
    if let Some(ints) = bounds.iter().map(DataPtr::as_int).collect::<Option<Vec<i64>>>() {
        let (first, last, step) = match ints[..] {
            [last] => (0, last, 1),
            [first, last] => (first, last, 1),
            [first, last, step] => (first, last, step),
            _ => return Err(runtime("range takes one to three arguments")),
        };
        return Ok(DataPtr::new(IntRange::new(first, last, step)?));
    }
    let floats = bounds
        .iter()
        .map(|value| value.as_number().ok_or_else(|| type_mismatch("number", value.type_name())))
        .collect::<Result<Vec<f64>, EvalError>>()?;
    let (first, last, step) = match floats[..] {
        [last] => (0.0, last, 1.0),
        [first, last] => (first, last, 1.0),
        [first, last, step] => (first, last, step),
        _ => return Err(runtime("range takes one to three arguments")),
    };
    Ok(DataPtr::new(FloatRange::new(first, last, step)?))
}

/// `object.field`: a struct binding or code metadata.
fn get_field(cx: &Cx<'_>, object: &DataPtr, field: SymbolId) -> EvalResult {
    if let Some(target) = object.downcast::<StructData>() {
        let value = target.memory().get(field)?;
        if let Some(code) = value.downcast::<CodeData>() {
            return Ok(DataPtr::new(code.rebound(Some(target.memory()))));
        }
        return Ok(value);
    }
    if let Some(code) = object.downcast::<CodeData>() {
        return code
            .metadata(field)
            .ok_or_else(|| missing_value(&cx.vm.symbols().name(field)));
    }
    Err(type_mismatch("struct or code", object.type_name()))
}
