use super::{Data, OpFailure, OpResult};
use crate::errors::runtime;
use crate::jit::Jitable;
use crate::memory::Memory;
use crate::vm::LoadedProgram;
use crate::{Cx, DataPtr, EvalError};
use bb_ir::{BlockSpan, OpCode, SymbolId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Weak};

/// A block of instructions as a value.
///
/// Code remembers the scope it was declared in so a call can find `this`
/// there. The reference is weak: a scope usually holds its own code
/// blocks, and code must not keep its scope alive.
///
/// Metadata set with `setfinal` is shared by every rebinding of the same
/// block.
#[derive(Clone, Debug)]
pub struct CodeData {
    program: Arc<LoadedProgram>,
    span: BlockSpan,
    declaration: Option<Weak<Memory>>,
    metadata: Arc<RwLock<FxHashMap<SymbolId, DataPtr>>>,
    parallel: bool,
    jit: Option<Arc<dyn Jitable>>,
}

impl CodeData {
    /// Block opened at `span.begin`, declared in `declaration`.
    pub fn new(program: &Arc<LoadedProgram>, span: BlockSpan, declaration: Option<&Arc<Memory>>) -> Self {
        CodeData {
            parallel: program.analysis().is_parallel(span.begin),
            jit: program.jit(span.begin),
            program: Arc::clone(program),
            span,
            declaration: declaration.map(Arc::downgrade),
            metadata: Arc::default(),
        }
    }

    /// The whole program as a block. Never parallel.
    pub fn root(program: &Arc<LoadedProgram>) -> Self {
        CodeData {
            program: Arc::clone(program),
            span: program.program().root(),
            declaration: None,
            metadata: Arc::default(),
            parallel: false,
            jit: None,
        }
    }

    /// Same block and metadata with another declaring scope.
    #[must_use]
    pub fn rebound(&self, declaration: Option<&Arc<Memory>>) -> Self {
        CodeData {
            declaration: declaration.map(Arc::downgrade),
            ..self.clone()
        }
    }

    pub fn program(&self) -> &Arc<LoadedProgram> {
        &self.program
    }

    pub fn span(&self) -> BlockSpan {
        self.span
    }

    /// Declaring scope, if it is still alive.
    pub fn declaration(&self) -> Option<Arc<Memory>> {
        self.declaration.as_ref()?.upgrade()
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn jit(&self) -> Option<&Arc<dyn Jitable>> {
        self.jit.as_ref()
    }

    pub fn metadata(&self, key: SymbolId) -> Option<DataPtr> {
        self.metadata.read().get(&key).cloned()
    }

    /// Attach `value` under `key`. Metadata is write-once.
    pub fn set_metadata(&self, key: SymbolId, value: DataPtr) -> Result<(), EvalError> {
        let mut metadata = self.metadata.write();
        if metadata.contains_key(&key) {
            let name = self.program.symbols().name(key);
            return Err(runtime(format!("Cannot overwrite final code metadata: {name}")));
        }
        metadata.insert(key, value);
        Ok(())
    }

    fn lines(&self) -> (usize, usize) {
        let program = self.program.program();
        let line = |index: usize| {
            program
                .commands()
                .get(index)
                .map_or(0, |command| command.origin.line)
        };
        let last = self.span.end.saturating_sub(1).max(self.span.start);
        (line(self.span.start), line(last))
    }
}

impl Data for CodeData {
    fn type_name(&self) -> &'static str {
        "code"
    }

    fn text(&self, _cx: &Cx<'_>, _this: &DataPtr) -> Result<String, EvalError> {
        let (first, last) = self.lines();
        Ok(format!("code block in lines {first}-{last}"))
    }

    fn unary(&self, _cx: &Cx<'_>, op: OpCode, _this: &DataPtr) -> OpResult {
        match op {
            OpCode::ToCopy => Ok(DataPtr::new(self.clone())),
            _ => Err(OpFailure::Unimplemented),
        }
    }
}
