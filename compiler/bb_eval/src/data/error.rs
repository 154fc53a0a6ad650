use super::Data;
use crate::{Cx, DataPtr, EvalError};
use std::sync::atomic::{AtomicBool, Ordering};

/// A failure captured as a value.
///
/// Errors start unconsumed. Handling constructs (`AS`, `catch`,
/// propagation into an operation) consume them; a scope that is released
/// while still holding an unconsumed error reports it.
#[derive(Debug)]
pub struct ErrorData {
    error: EvalError,
    consumed: AtomicBool,
}

impl ErrorData {
    pub fn new(error: EvalError) -> Self {
        ErrorData {
            error,
            consumed: AtomicBool::new(false),
        }
    }

    /// Wrap `error` as an unconsumed error value.
    pub fn value(error: EvalError) -> DataPtr {
        DataPtr::new(Self::new(error))
    }

    /// Wrap `error` as an already handled error value.
    pub fn consumed_value(error: EvalError) -> DataPtr {
        let data = Self::new(error);
        data.consume();
        DataPtr::new(data)
    }

    pub fn error(&self) -> &EvalError {
        &self.error
    }

    pub fn consume(&self) {
        self.consumed.store(true, Ordering::Release);
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }
}

impl Data for ErrorData {
    fn type_name(&self) -> &'static str {
        "error"
    }

    fn text(&self, _cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        self.consume();
        Ok(self.error.to_string())
    }
}
