#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    reason = "Language numbers convert between i64 and f64 by definition"
)]
//! bbvm execution core.
//!
//! This crate runs loaded bytecode:
//!
//! - [`DataPtr`]: the tagged value (inline literal or shared heap object)
//! - [`Data`]: the operation protocol heap objects implement
//! - [`Memory`]: scope memory with final bindings, mutable visibility and
//!   attached background tasks
//! - [`dispatch`]: literal fast paths, then receiver dispatch, then failure
//! - [`interpreter`]: per-instruction semantics and block execution
//! - [`Vm`]: loading, analysis, the thread gate and the value cache
//!
//! Calls to blocks the analyzer marks side-effect free may run on
//! background threads when the [`ThreadGate`] admits them; their results
//! are futures that resolve on first read.

mod concurrency;
mod console;
pub mod data;
pub mod dispatch;
pub mod errors;
pub mod interpreter;
mod jit;
mod memory;
mod stack;
mod value;
mod vm;

pub use concurrency::{ThreadGate, ThreadPermit};
pub use console::{
    buffer_console, scripted_console, silent_console, stdout_console, BufferConsole, Console,
    SharedConsole,
};
pub use data::{Data, Obj, OpFailure, OpResult, Side};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use interpreter::{close_scope, execute_block, Cx};
pub use jit::{JitProbe, Jitable, ReturnLiteral, ReturnLiteralProbe};
pub use memory::Memory;
pub use value::{DataPtr, ValueFlags};
pub use vm::{LoadedProgram, Vm, VmBuilder, VmConfig, VmError};

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
