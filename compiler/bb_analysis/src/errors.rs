use bb_ir::BytecodeError;
use thiserror::Error;

/// Reasons a program is rejected before it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("malformed bytecode: {0}")]
    Malformed(#[from] BytecodeError),

    #[error("symbol `{name}` used at line {line} is never defined")]
    UndefinedSymbol { name: String, line: usize },
}
