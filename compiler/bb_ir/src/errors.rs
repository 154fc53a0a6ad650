//! Errors raised while loading bytecode text.

use thiserror::Error;

/// A malformed bytecode program.
///
/// Line numbers are 1-based and count annotation lines too, so they match
/// what an editor shows for the `.bbvm` file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
    #[error("unknown operation `{name}` at line {line}")]
    UnknownOperation { name: String, line: usize },

    #[error("unable to understand builtin value prefix (should be one of I,F,B,\"): {raw} at line {line}")]
    BadLiteral { raw: String, line: usize },

    #[error("`{op}` expects at least {expected} operand(s) at line {line}")]
    MissingOperand {
        op: &'static str,
        expected: usize,
        line: usize,
    },

    #[error("block opened at line {line} is never closed by END")]
    UnmatchedBegin { line: usize },

    #[error("END at line {line} does not close any block")]
    UnmatchedEnd { line: usize },

    #[error("symbol table exceeded capacity ({count} symbols)")]
    SymbolOverflow { count: usize },
}
