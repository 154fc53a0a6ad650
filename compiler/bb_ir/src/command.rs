//! A single bytecode instruction.

use crate::{OpCode, SymbolId, SymbolTable};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Constant carried by a `BUILTIN` instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Arc<str>),
}

impl Literal {
    /// Parse the raw literal token: `I<int>`, `F<float>`, `Btrue`/`Bfalse`
    /// or a double-quoted string.
    pub fn parse(raw: &str) -> Option<Literal> {
        if let Some(body) = raw.strip_prefix('"') {
            let body = body.strip_suffix('"').unwrap_or(body);
            return Some(Literal::Str(Arc::from(body)));
        }
        if let Some(digits) = raw.strip_prefix('I') {
            return digits.parse().ok().map(Literal::Int);
        }
        if let Some(digits) = raw.strip_prefix('F') {
            return digits.parse().ok().map(Literal::Float);
        }
        match raw {
            "Btrue" => Some(Literal::Bool(true)),
            "Bfalse" => Some(Literal::Bool(false)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "I{v}"),
            Literal::Float(v) => write!(f, "F{v}"),
            Literal::Bool(v) => write!(f, "B{v}"),
            Literal::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

/// Where an instruction came from.
#[derive(Clone, Debug, PartialEq)]
pub struct Origin {
    pub path: Arc<str>,
    /// 1-based physical line in the bytecode file.
    pub line: usize,
    /// High-level source text from a preceding `%` line, if any.
    pub annotation: Option<Arc<str>>,
}

/// One instruction: operation, operands and optional literal.
///
/// `args[0]` is the destination; [`SymbolId::NONE`] means the result is
/// discarded.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub op: OpCode,
    pub args: SmallVec<[SymbolId; 4]>,
    pub literal: Option<Literal>,
    pub origin: Origin,
}

impl Command {
    #[inline]
    pub fn dest(&self) -> SymbolId {
        self.args.first().copied().unwrap_or(SymbolId::NONE)
    }

    /// Operand at `i`, treating absent operands as [`SymbolId::NONE`].
    #[inline]
    pub fn arg(&self, i: usize) -> SymbolId {
        self.args.get(i).copied().unwrap_or(SymbolId::NONE)
    }

    /// Operands after the destination.
    #[inline]
    pub fn sources(&self) -> &[SymbolId] {
        self.args.get(1..).unwrap_or(&[])
    }

    /// Human-readable form for diagnostics: the annotation when present,
    /// otherwise the instruction rebuilt from its symbols.
    pub fn describe(&self, symbols: &SymbolTable) -> String {
        if let Some(annotation) = &self.origin.annotation {
            return annotation.to_string();
        }
        let mut text = String::from(self.op.name());
        for (i, arg) in self.args.iter().enumerate() {
            text.push(' ');
            text.push_str(&symbols.name(*arg));
            if i == 0 {
                if let Some(literal) = &self.literal {
                    text.push(' ');
                    text.push_str(&literal.to_string());
                }
            }
        }
        text
    }
}
