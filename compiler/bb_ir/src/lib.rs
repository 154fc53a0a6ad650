//! Intermediate representation for the bbvm interpreter.
//!
//! A program arrives as a line-oriented bytecode text (`.bbvm`). Every line
//! is one [`Command`]: an [`OpCode`], a list of symbol operands (the first is
//! always the destination) and, for `BUILTIN`, a [`Literal`]. Symbols are
//! interned once per VM instance in a [`SymbolTable`].
//!
//! [`Program`] owns the command list together with the precomputed
//! `BEGIN`/`END` pairing, so execution never scans for block boundaries.

mod command;
mod errors;
mod opcode;
mod program;
mod symbol;

pub use command::{Command, Literal, Origin};
pub use errors::BytecodeError;
pub use opcode::OpCode;
pub use program::{BlockSpan, Program};
pub use symbol::{SharedSymbols, SymbolId, SymbolTable};
