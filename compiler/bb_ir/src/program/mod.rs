//! Loading bytecode text into a [`Program`].
//!
//! Loading does all the structural work up front: tokenizing, literal
//! parsing, `%` annotation capture and `BEGIN`/`END` pairing. A program that
//! loads successfully has balanced blocks.

use crate::{BytecodeError, Command, Literal, OpCode, Origin, SymbolTable};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Instruction range of one block.
///
/// `begin` is the index of the opening instruction (for the top-level
/// program, `begin == start == 0` and there is no opener). Execution covers
/// `start..optimized_end`; `end` is the index of the closing `END` (or the
/// program length).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockSpan {
    pub begin: usize,
    pub start: usize,
    pub end: usize,
    pub optimized_end: usize,
}

impl BlockSpan {
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }
}

/// A loaded bytecode program.
#[derive(Debug)]
pub struct Program {
    path: Arc<str>,
    commands: Vec<Command>,
    /// Opener index to block span.
    blocks: FxHashMap<usize, BlockSpan>,
    root: BlockSpan,
}

impl Program {
    /// Parse bytecode `source`, interning symbols into `symbols`.
    pub fn parse(source: &str, path: &str, symbols: &SymbolTable) -> Result<Program, BytecodeError> {
        let path: Arc<str> = Arc::from(path);
        let mut commands = Vec::new();
        let mut annotation: Option<Arc<str>> = None;

        for (index, raw_line) in source.lines().enumerate() {
            let line = index + 1;
            let text = raw_line.trim_end_matches('\r').trim_start();
            if let Some(rest) = text.strip_prefix('%') {
                annotation = Some(Arc::from(rest.trim()));
                continue;
            }
            if text.trim().is_empty() {
                continue;
            }
            let origin = Origin {
                path: Arc::clone(&path),
                line,
                annotation: annotation.take(),
            };
            commands.push(parse_command(text, origin, symbols)?);
        }

        Self::from_commands(path, commands)
    }

    /// Build a program from already constructed commands.
    pub fn from_commands(path: Arc<str>, commands: Vec<Command>) -> Result<Program, BytecodeError> {
        let mut blocks = FxHashMap::default();
        let mut open: Vec<usize> = Vec::new();
        for (i, command) in commands.iter().enumerate() {
            if command.op.opens_block() {
                open.push(i);
            } else if command.op == OpCode::End {
                let begin = open.pop().ok_or(BytecodeError::UnmatchedEnd {
                    line: command.origin.line,
                })?;
                blocks.insert(
                    begin,
                    BlockSpan {
                        begin,
                        start: begin + 1,
                        end: i,
                        optimized_end: i,
                    },
                );
            }
        }
        if let Some(&begin) = open.first() {
            return Err(BytecodeError::UnmatchedBegin {
                line: commands[begin].origin.line,
            });
        }

        let mut program = Program {
            path,
            root: BlockSpan {
                begin: 0,
                start: 0,
                end: commands.len(),
                optimized_end: commands.len(),
            },
            commands,
            blocks,
        };
        program.root.optimized_end = program.first_exit(program.root);
        let spans: Vec<BlockSpan> = program.blocks.values().copied().collect();
        for span in spans {
            let optimized_end = program.first_exit(span);
            if let Some(block) = program.blocks.get_mut(&span.begin) {
                block.optimized_end = optimized_end;
            }
        }
        Ok(program)
    }

    /// One past the first top-level `return` of `span`, or its end.
    fn first_exit(&self, span: BlockSpan) -> usize {
        let mut i = span.start;
        while i < span.end {
            let command = &self.commands[i];
            if command.op.opens_block() {
                i = self.blocks.get(&i).map_or(span.end, |b| b.end + 1);
                continue;
            }
            if command.op == OpCode::Return {
                return i + 1;
            }
            i += 1;
        }
        span.end
    }

    pub fn path(&self) -> &Arc<str> {
        &self.path
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    pub fn command(&self, index: usize) -> &Command {
        &self.commands[index]
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The whole program as a block.
    pub fn root(&self) -> BlockSpan {
        self.root
    }

    /// Span of the block opened at `begin`.
    #[inline]
    pub fn block(&self, begin: usize) -> Option<BlockSpan> {
        self.blocks.get(&begin).copied()
    }

    /// All blocks, ordered by position.
    pub fn blocks(&self) -> Vec<BlockSpan> {
        let mut spans: Vec<BlockSpan> = self.blocks.values().copied().collect();
        spans.sort_by_key(|span| span.begin);
        spans
    }
}

/// Split a line on spaces, keeping double-quoted runs together.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::with_capacity(4);
    let mut in_string = false;
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match c {
            '"' => {
                in_string = !in_string;
                start.get_or_insert(i);
            }
            ' ' | '\t' if !in_string => {
                if let Some(s) = start.take() {
                    tokens.push(&text[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

fn parse_command(text: &str, origin: Origin, symbols: &SymbolTable) -> Result<Command, BytecodeError> {
    let tokens = tokenize(text);
    let Some((&name, operands)) = tokens.split_first() else {
        return Err(BytecodeError::UnknownOperation {
            name: String::new(),
            line: origin.line,
        });
    };
    let op = OpCode::from_name(name).ok_or_else(|| BytecodeError::UnknownOperation {
        name: name.to_string(),
        line: origin.line,
    })?;

    let mut literal = None;
    let mut args: SmallVec<[_; 4]> = SmallVec::new();
    for (i, token) in operands.iter().enumerate() {
        if op == OpCode::Builtin && i == 1 {
            literal = Some(Literal::parse(token).ok_or_else(|| BytecodeError::BadLiteral {
                raw: (*token).to_string(),
                line: origin.line,
            })?);
        } else {
            args.push(symbols.try_intern(token)?);
        }
    }

    if args.len() < op.min_operands() || (op == OpCode::Builtin && literal.is_none()) {
        return Err(BytecodeError::MissingOperand {
            op: op.name(),
            expected: op.min_operands(),
            line: origin.line,
        });
    }

    Ok(Command {
        op,
        args,
        literal,
        origin,
    })
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
