//! Pluggable accelerators for code blocks.
//!
//! When a block is created, every registered [`JitProbe`] may offer a
//! [`Jitable`] for it. The interpreter tries the accelerator before
//! walking the block's instructions; an accelerator that declines (returns
//! `false`) costs nothing but the call.

use crate::memory::Memory;
use crate::DataPtr;
use bb_ir::{BlockSpan, OpCode, Program};
use std::fmt;
use std::sync::Arc;

/// Native replacement for interpreting one block.
pub trait Jitable: Send + Sync + fmt::Debug {
    /// Run the block in `memory`. Returns `false` to fall back to the
    /// interpreter, leaving `result` and `signal` untouched.
    fn run(&self, memory: &Arc<Memory>, result: &mut DataPtr, signal: &mut bool) -> bool;

    /// Run the block when only its truth value is wanted (loop and branch
    /// conditions).
    fn run_with_boolean_intent(&self, _memory: &Arc<Memory>, _result: &mut bool, _signal: &mut bool) -> bool {
        false
    }
}

/// Inspects a block at creation time and may offer an accelerator.
pub trait JitProbe: Send + Sync {
    fn probe(&self, program: &Program, literals: &[Option<DataPtr>], span: BlockSpan) -> Option<Arc<dyn Jitable>>;
}

/// A block that only returns a constant.
#[derive(Debug)]
pub struct ReturnLiteral {
    value: DataPtr,
}

impl Jitable for ReturnLiteral {
    fn run(&self, _memory: &Arc<Memory>, result: &mut DataPtr, signal: &mut bool) -> bool {
        *result = self.value.clone();
        *signal = true;
        true
    }

    fn run_with_boolean_intent(&self, _memory: &Arc<Memory>, result: &mut bool, signal: &mut bool) -> bool {
        match self.value.as_bool() {
            Some(value) => {
                *result = value;
                *signal = true;
                true
            }
            None => false,
        }
    }
}

/// Recognizes `BUILTIN t <literal>; return # t`.
#[derive(Debug, Default)]
pub struct ReturnLiteralProbe;

impl JitProbe for ReturnLiteralProbe {
    fn probe(&self, program: &Program, literals: &[Option<DataPtr>], span: BlockSpan) -> Option<Arc<dyn Jitable>> {
        if span.end - span.start != 2 {
            return None;
        }
        let load = program.command(span.start);
        let ret = program.command(span.start + 1);
        if load.op != OpCode::Builtin || ret.op != OpCode::Return || ret.arg(1) != load.dest() {
            return None;
        }
        let value = literals.get(span.start)?.clone()?;
        Some(Arc::new(ReturnLiteral { value }))
    }
}

/// First accelerator any probe offers for `span`.
pub(crate) fn probe_block(
    probes: &[Arc<dyn JitProbe>],
    program: &Program,
    literals: &[Option<DataPtr>],
    span: BlockSpan,
) -> Option<Arc<dyn Jitable>> {
    probes
        .iter()
        .find_map(|probe| probe.probe(program, literals, span))
}
