//! Runtime errors.
//!
//! [`EvalError`] is what unwinds a block. It carries a typed
//! [`EvalErrorKind`] and a trace: one line per instruction the error passed
//! through on its way out, innermost first.
//!
//! Factory functions are the public way to build errors; they are `#[cold]`
//! since they sit on failure paths of hot dispatch code.

use thiserror::Error;
use std::fmt;

/// Result of evaluating something that yields a value.
pub type EvalResult = Result<crate::DataPtr, EvalError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    #[error("Missing value: {name}")]
    MissingValue { name: String },

    #[error("Mutable symbol cannot be accessed from a nested block: {name}")]
    MutableNotVisible { name: String },

    #[error("Cannot overwrite final value: {name}")]
    FinalViolation { name: String },

    #[error("No valid builtin implementation for this method: {op}({types})")]
    NoImplementation { op: &'static str, types: String },

    #[error("Integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },

    #[error("Modulo by zero")]
    ModuloByZero,

    #[error("Index {index} out of range [0,{len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("Out of range")]
    OutOfRange,

    #[error("{expected} expected but {got} was found")]
    TypeMismatch { expected: &'static str, got: String },

    #[error("Intercepted error not handled: {message}")]
    UnhandledError { message: String },

    #[error("{message}")]
    Failure { message: String },

    #[error("{message}")]
    Runtime { message: String },
}

/// An error unwinding the interpreter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    trace: Vec<String>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        EvalError {
            kind,
            trace: Vec::new(),
        }
    }

    /// Message without the trace.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Append the position of an instruction the error unwound through.
    #[must_use]
    pub fn with_frame(mut self, frame: String) -> Self {
        self.trace.push(frame);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for frame in &self.trace {
            write!(f, "\n   -> {frame}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        EvalError::new(kind)
    }
}

#[cold]
pub fn missing_value(name: &str) -> EvalError {
    EvalErrorKind::MissingValue {
        name: name.to_string(),
    }
    .into()
}

#[cold]
pub fn mutable_not_visible(name: &str) -> EvalError {
    EvalErrorKind::MutableNotVisible {
        name: name.to_string(),
    }
    .into()
}

#[cold]
pub fn final_violation(name: &str) -> EvalError {
    EvalErrorKind::FinalViolation {
        name: name.to_string(),
    }
    .into()
}

#[cold]
pub fn no_implementation(op: &'static str, types: &[&str]) -> EvalError {
    EvalErrorKind::NoImplementation {
        op,
        types: types.join(", "),
    }
    .into()
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalErrorKind::IntegerOverflow { operation }.into()
}

#[cold]
pub fn modulo_by_zero() -> EvalError {
    EvalErrorKind::ModuloByZero.into()
}

#[cold]
pub fn index_out_of_range(index: i64, len: usize) -> EvalError {
    EvalErrorKind::IndexOutOfRange { index, len }.into()
}

#[cold]
pub fn out_of_range() -> EvalError {
    EvalErrorKind::OutOfRange.into()
}

#[cold]
pub fn type_mismatch(expected: &'static str, got: &str) -> EvalError {
    EvalErrorKind::TypeMismatch {
        expected,
        got: got.to_string(),
    }
    .into()
}

#[cold]
pub fn unhandled_error(message: &str) -> EvalError {
    EvalErrorKind::UnhandledError {
        message: message.to_string(),
    }
    .into()
}

/// Error raised on purpose by the program (`fail`).
#[cold]
pub fn failure(message: impl Into<String>) -> EvalError {
    EvalErrorKind::Failure {
        message: message.into(),
    }
    .into()
}

#[cold]
pub fn runtime(message: impl Into<String>) -> EvalError {
    EvalErrorKind::Runtime {
        message: message.into(),
    }
    .into()
}
